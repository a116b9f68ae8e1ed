use sea_query::{ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table};

use crate::schema::{
    Bookings, Categories, ClassSchedules, Classes, InstructorProfiles, Metadata, Pages,
    SiteSettings, Users, Venues,
};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS pages (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     slug TEXT NOT NULL UNIQUE,
///     title TEXT NOT NULL,
///     status TEXT NOT NULL,
///     seo TEXT NOT NULL,           -- JSON object
///     publish_at_ms INTEGER NULL,
///     blocks TEXT NOT NULL,        -- JSON array of {id, type, ...props}
///     created_at_ms INTEGER NOT NULL,
///     updated_at_ms INTEGER NOT NULL
/// )
pub fn create_pages_table() -> String {
    Table::create()
        .table(Pages::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Pages::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Pages::Slug).string().not_null().unique_key())
        .col(ColumnDef::new(Pages::Title).string().not_null())
        .col(ColumnDef::new(Pages::Status).string().not_null())
        .col(ColumnDef::new(Pages::Seo).text().not_null())
        .col(ColumnDef::new(Pages::PublishAtMs).big_integer().null())
        .col(ColumnDef::new(Pages::Blocks).text().not_null())
        .col(ColumnDef::new(Pages::CreatedAtMs).big_integer().not_null())
        .col(ColumnDef::new(Pages::UpdatedAtMs).big_integer().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS site_settings (id INTEGER PRIMARY KEY, settings TEXT NOT NULL, updated_at_ms INTEGER NOT NULL)
pub fn create_site_settings_table() -> String {
    Table::create()
        .table(SiteSettings::Table)
        .if_not_exists()
        .col(ColumnDef::new(SiteSettings::Id).integer().primary_key())
        .col(ColumnDef::new(SiteSettings::Settings).text().not_null())
        .col(
            ColumnDef::new(SiteSettings::UpdatedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS users (id TEXT PRIMARY KEY, email, display_name, role, created_at_ms)
pub fn create_users_table() -> String {
    Table::create()
        .table(Users::Table)
        .if_not_exists()
        .col(ColumnDef::new(Users::Id).string().primary_key())
        .col(ColumnDef::new(Users::Email).string().not_null())
        .col(ColumnDef::new(Users::DisplayName).string().not_null())
        .col(ColumnDef::new(Users::Role).string().not_null())
        .col(ColumnDef::new(Users::CreatedAtMs).big_integer().not_null())
        .to_string(SqliteQueryBuilder)
}

pub fn create_categories_table() -> String {
    Table::create()
        .table(Categories::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Categories::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(Categories::Slug)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Categories::Name).string().not_null())
        .to_string(SqliteQueryBuilder)
}

pub fn create_venues_table() -> String {
    Table::create()
        .table(Venues::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Venues::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Venues::Name).string().not_null().unique_key())
        .col(ColumnDef::new(Venues::Address).string().not_null())
        .col(ColumnDef::new(Venues::City).string().not_null())
        .to_string(SqliteQueryBuilder)
}

pub fn create_instructor_profiles_table() -> String {
    Table::create()
        .table(InstructorProfiles::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(InstructorProfiles::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(InstructorProfiles::UserId).string().null())
        .col(
            ColumnDef::new(InstructorProfiles::DisplayName)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(InstructorProfiles::Bio).text().not_null())
        .col(ColumnDef::new(InstructorProfiles::AvatarUrl).string().null())
        .col(
            ColumnDef::new(InstructorProfiles::Specialties)
                .string()
                .not_null()
                .default(""),
        )
        .foreign_key(
            ForeignKey::create()
                .from(InstructorProfiles::Table, InstructorProfiles::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::SetNull),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS classes (..., category_id, instructor_id, venue_id REFERENCES ...)
pub fn create_classes_table() -> String {
    Table::create()
        .table(Classes::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Classes::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Classes::Title).string().not_null().unique_key())
        .col(ColumnDef::new(Classes::Description).text().not_null())
        .col(ColumnDef::new(Classes::CategoryId).big_integer().not_null())
        .col(ColumnDef::new(Classes::InstructorId).big_integer().not_null())
        .col(ColumnDef::new(Classes::VenueId).big_integer().not_null())
        .col(ColumnDef::new(Classes::PriceCents).big_integer().not_null())
        .col(ColumnDef::new(Classes::MinAge).integer().not_null())
        .col(ColumnDef::new(Classes::MaxAge).integer().not_null())
        .col(ColumnDef::new(Classes::ImageUrl).string().null())
        .col(
            ColumnDef::new(Classes::IsPublished)
                .integer()
                .not_null()
                .default(0),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Classes::Table, Classes::CategoryId)
                .to(Categories::Table, Categories::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Classes::Table, Classes::InstructorId)
                .to(InstructorProfiles::Table, InstructorProfiles::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Classes::Table, Classes::VenueId)
                .to(Venues::Table, Venues::Id),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS class_schedules (
///     ...,
///     seats_remaining INTEGER NOT NULL CHECK (seats_remaining >= 0)
/// )
pub fn create_class_schedules_table() -> String {
    Table::create()
        .table(ClassSchedules::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ClassSchedules::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(ClassSchedules::ClassId).big_integer().not_null())
        .col(
            ColumnDef::new(ClassSchedules::StartsAtMs)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ClassSchedules::EndsAtMs)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ClassSchedules::SeatsTotal)
                .integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ClassSchedules::SeatsRemaining)
                .integer()
                .not_null()
                .check(Expr::col(ClassSchedules::SeatsRemaining).gte(0)),
        )
        .foreign_key(
            ForeignKey::create()
                .from(ClassSchedules::Table, ClassSchedules::ClassId)
                .to(Classes::Table, Classes::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

pub fn create_bookings_table() -> String {
    Table::create()
        .table(Bookings::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Bookings::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(Bookings::Reference)
                .string()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Bookings::ScheduleId).big_integer().not_null())
        .col(ColumnDef::new(Bookings::ParentId).string().not_null())
        .col(ColumnDef::new(Bookings::Status).string().not_null())
        .col(ColumnDef::new(Bookings::AmountCents).big_integer().not_null())
        .col(ColumnDef::new(Bookings::PaymentReference).string().null())
        .col(ColumnDef::new(Bookings::CreatedAtMs).big_integer().not_null())
        .col(ColumnDef::new(Bookings::UpdatedAtMs).big_integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(Bookings::Table, Bookings::ScheduleId)
                .to(ClassSchedules::Table, ClassSchedules::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Bookings::Table, Bookings::ParentId)
                .to(Users::Table, Users::Id),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE UNIQUE INDEX IF NOT EXISTS idx_class_schedules_class_start ON class_schedules(class_id, starts_at_ms)
pub fn create_class_schedules_class_index() -> String {
    Index::create()
        .if_not_exists()
        .unique()
        .name("idx_class_schedules_class_start")
        .table(ClassSchedules::Table)
        .col(ClassSchedules::ClassId)
        .col(ClassSchedules::StartsAtMs)
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_bookings_status_created ON bookings(status, created_at_ms)
pub fn create_bookings_status_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_bookings_status_created")
        .table(Bookings::Table)
        .col(Bookings::Status)
        .col(Bookings::CreatedAtMs)
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_classes_instructor_id ON classes(instructor_id)
pub fn create_classes_instructor_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_classes_instructor_id")
        .table(Classes::Table)
        .col(Classes::InstructorId)
        .to_string(SqliteQueryBuilder)
}

/// All DDL statements in dependency order
pub fn all_statements() -> Vec<String> {
    vec![
        create_metadata_table(),
        create_pages_table(),
        create_site_settings_table(),
        create_users_table(),
        create_categories_table(),
        create_venues_table(),
        create_instructor_profiles_table(),
        create_classes_table(),
        create_class_schedules_table(),
        create_bookings_table(),
        create_class_schedules_class_index(),
        create_bookings_status_index(),
        create_classes_instructor_index(),
    ]
}
