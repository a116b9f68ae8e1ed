use sea_query::{
    Alias, Cond, Expr, LikeExpr, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder,
};

use crate::schema::{Categories, ClassSchedules, Classes, InstructorProfiles, Users, Venues};

/// Filters for the joined class listing
#[derive(Debug, Default, Clone)]
pub struct ClassFilter<'a> {
    pub class_id: Option<i64>,
    pub category_slug: Option<&'a str>,
    pub instructor_id: Option<i64>,
    /// Case-insensitive substring over title and description
    pub text: Option<&'a str>,
    pub published_only: bool,
    pub limit: Option<u64>,
}

/// Escape LIKE wildcards and wrap the text in `%...%`
pub fn contains_pattern(text: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('!')
}

/// SELECT classes.*, category slug/name, instructor name, venue name/city
/// FROM classes JOIN categories JOIN instructor_profiles JOIN venues
fn class_summary_select() -> SelectStatement {
    Query::select()
        .columns([
            (Classes::Table, Classes::Id),
            (Classes::Table, Classes::Title),
            (Classes::Table, Classes::Description),
            (Classes::Table, Classes::PriceCents),
            (Classes::Table, Classes::MinAge),
            (Classes::Table, Classes::MaxAge),
            (Classes::Table, Classes::ImageUrl),
            (Classes::Table, Classes::IsPublished),
            (Classes::Table, Classes::InstructorId),
            (Classes::Table, Classes::VenueId),
        ])
        .expr_as(
            Expr::col((Categories::Table, Categories::Slug)),
            Alias::new("category_slug"),
        )
        .expr_as(
            Expr::col((Categories::Table, Categories::Name)),
            Alias::new("category_name"),
        )
        .expr_as(
            Expr::col((InstructorProfiles::Table, InstructorProfiles::DisplayName)),
            Alias::new("instructor_name"),
        )
        .expr_as(
            Expr::col((Venues::Table, Venues::Name)),
            Alias::new("venue_name"),
        )
        .expr_as(Expr::col((Venues::Table, Venues::City)), Alias::new("city"))
        .from(Classes::Table)
        .inner_join(
            Categories::Table,
            Expr::col((Classes::Table, Classes::CategoryId))
                .equals((Categories::Table, Categories::Id)),
        )
        .inner_join(
            InstructorProfiles::Table,
            Expr::col((Classes::Table, Classes::InstructorId))
                .equals((InstructorProfiles::Table, InstructorProfiles::Id)),
        )
        .inner_join(
            Venues::Table,
            Expr::col((Classes::Table, Classes::VenueId)).equals((Venues::Table, Venues::Id)),
        )
        .to_owned()
}

/// Joined class summaries matching `filter`, ordered by title
pub fn select_class_summaries(filter: &ClassFilter<'_>) -> String {
    let mut query = class_summary_select();

    if let Some(id) = filter.class_id {
        query.and_where(Expr::col((Classes::Table, Classes::Id)).eq(id));
    }
    if let Some(slug) = filter.category_slug {
        query.and_where(Expr::col((Categories::Table, Categories::Slug)).eq(slug));
    }
    if let Some(instructor_id) = filter.instructor_id {
        query.and_where(Expr::col((Classes::Table, Classes::InstructorId)).eq(instructor_id));
    }
    if let Some(text) = filter.text {
        query.cond_where(
            Cond::any()
                .add(Expr::col((Classes::Table, Classes::Title)).like(contains_pattern(text)))
                .add(
                    Expr::col((Classes::Table, Classes::Description))
                        .like(contains_pattern(text)),
                ),
        );
    }
    if filter.published_only {
        query.and_where(Expr::col((Classes::Table, Classes::IsPublished)).eq(1));
    }
    query.order_by((Classes::Table, Classes::Title), Order::Asc);
    if let Some(limit) = filter.limit {
        query.limit(limit);
    }
    query.to_string(SqliteQueryBuilder)
}

/// SELECT id, slug, name FROM categories ORDER BY name
pub fn select_categories() -> String {
    Query::select()
        .columns([Categories::Id, Categories::Slug, Categories::Name])
        .from(Categories::Table)
        .order_by(Categories::Name, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, name, address, city FROM venues WHERE id = ?
pub fn select_venue_by_id(id: i64) -> String {
    Query::select()
        .columns([Venues::Id, Venues::Name, Venues::Address, Venues::City])
        .from(Venues::Table)
        .and_where(Expr::col(Venues::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

fn instructor_select() -> SelectStatement {
    Query::select()
        .columns([
            InstructorProfiles::Id,
            InstructorProfiles::UserId,
            InstructorProfiles::DisplayName,
            InstructorProfiles::Bio,
            InstructorProfiles::AvatarUrl,
            InstructorProfiles::Specialties,
        ])
        .from(InstructorProfiles::Table)
        .to_owned()
}

/// SELECT ... FROM instructor_profiles WHERE id = ?
pub fn select_instructor_by_id(id: i64) -> String {
    instructor_select()
        .and_where(Expr::col(InstructorProfiles::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM instructor_profiles WHERE display_name LIKE ? OR specialties LIKE ? ORDER BY display_name LIMIT ?
pub fn select_instructors_matching(text: &str, limit: u64) -> String {
    instructor_select()
        .cond_where(
            Cond::any()
                .add(Expr::col(InstructorProfiles::DisplayName).like(contains_pattern(text)))
                .add(Expr::col(InstructorProfiles::Specialties).like(contains_pattern(text))),
        )
        .order_by(InstructorProfiles::DisplayName, Order::Asc)
        .limit(limit)
        .to_string(SqliteQueryBuilder)
}

fn schedule_select() -> SelectStatement {
    Query::select()
        .columns([
            ClassSchedules::Id,
            ClassSchedules::ClassId,
            ClassSchedules::StartsAtMs,
            ClassSchedules::EndsAtMs,
            ClassSchedules::SeatsTotal,
            ClassSchedules::SeatsRemaining,
        ])
        .from(ClassSchedules::Table)
        .to_owned()
}

/// SELECT ... FROM class_schedules WHERE class_id = ? AND starts_at_ms >= ? ORDER BY starts_at_ms
pub fn select_upcoming_schedules(class_id: i64, after_ms: i64) -> String {
    schedule_select()
        .and_where(Expr::col(ClassSchedules::ClassId).eq(class_id))
        .and_where(Expr::col(ClassSchedules::StartsAtMs).gte(after_ms))
        .order_by(ClassSchedules::StartsAtMs, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM class_schedules WHERE id = ?
pub fn select_schedule_by_id(id: i64) -> String {
    schedule_select()
        .and_where(Expr::col(ClassSchedules::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

// ============================================================================
// Writes (seed data and identity mirroring)
// ============================================================================

/// INSERT INTO users ... ON CONFLICT (id) DO UPDATE SET email, display_name, role
pub fn upsert_user(id: &str, email: &str, display_name: &str, role: &str, now_ms: i64) -> String {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::Email,
            Users::DisplayName,
            Users::Role,
            Users::CreatedAtMs,
        ])
        .values_panic([
            id.into(),
            email.into(),
            display_name.into(),
            role.into(),
            now_ms.into(),
        ])
        .on_conflict(
            OnConflict::column(Users::Id)
                .update_columns([Users::Email, Users::DisplayName, Users::Role])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO categories (slug, name) ... ON CONFLICT (slug) DO UPDATE SET name RETURNING id
pub fn upsert_category(slug: &str, name: &str) -> String {
    Query::insert()
        .into_table(Categories::Table)
        .columns([Categories::Slug, Categories::Name])
        .values_panic([slug.into(), name.into()])
        .on_conflict(
            OnConflict::column(Categories::Slug)
                .update_column(Categories::Name)
                .to_owned(),
        )
        .returning_col(Categories::Id)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO venues (name, address, city) ... ON CONFLICT (name) DO UPDATE RETURNING id
pub fn upsert_venue(name: &str, address: &str, city: &str) -> String {
    Query::insert()
        .into_table(Venues::Table)
        .columns([Venues::Name, Venues::Address, Venues::City])
        .values_panic([name.into(), address.into(), city.into()])
        .on_conflict(
            OnConflict::column(Venues::Name)
                .update_columns([Venues::Address, Venues::City])
                .to_owned(),
        )
        .returning_col(Venues::Id)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO instructor_profiles ... ON CONFLICT (display_name) DO UPDATE RETURNING id
pub fn upsert_instructor(
    user_id: Option<&str>,
    display_name: &str,
    bio: &str,
    avatar_url: Option<&str>,
    specialties: &str,
) -> String {
    Query::insert()
        .into_table(InstructorProfiles::Table)
        .columns([
            InstructorProfiles::UserId,
            InstructorProfiles::DisplayName,
            InstructorProfiles::Bio,
            InstructorProfiles::AvatarUrl,
            InstructorProfiles::Specialties,
        ])
        .values_panic([
            user_id.map(str::to_string).into(),
            display_name.into(),
            bio.into(),
            avatar_url.map(str::to_string).into(),
            specialties.into(),
        ])
        .on_conflict(
            OnConflict::column(InstructorProfiles::DisplayName)
                .update_columns([
                    InstructorProfiles::UserId,
                    InstructorProfiles::Bio,
                    InstructorProfiles::AvatarUrl,
                    InstructorProfiles::Specialties,
                ])
                .to_owned(),
        )
        .returning_col(InstructorProfiles::Id)
        .to_string(SqliteQueryBuilder)
}

/// Column values for a class write
pub struct ClassRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category_id: i64,
    pub instructor_id: i64,
    pub venue_id: i64,
    pub price_cents: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub image_url: Option<&'a str>,
    pub is_published: bool,
}

/// INSERT INTO classes ... ON CONFLICT (title) DO UPDATE RETURNING id
pub fn upsert_class(row: &ClassRow<'_>) -> String {
    Query::insert()
        .into_table(Classes::Table)
        .columns([
            Classes::Title,
            Classes::Description,
            Classes::CategoryId,
            Classes::InstructorId,
            Classes::VenueId,
            Classes::PriceCents,
            Classes::MinAge,
            Classes::MaxAge,
            Classes::ImageUrl,
            Classes::IsPublished,
        ])
        .values_panic([
            row.title.into(),
            row.description.into(),
            row.category_id.into(),
            row.instructor_id.into(),
            row.venue_id.into(),
            row.price_cents.into(),
            row.min_age.into(),
            row.max_age.into(),
            row.image_url.map(str::to_string).into(),
            (row.is_published as i32).into(),
        ])
        .on_conflict(
            OnConflict::column(Classes::Title)
                .update_columns([
                    Classes::Description,
                    Classes::CategoryId,
                    Classes::InstructorId,
                    Classes::VenueId,
                    Classes::PriceCents,
                    Classes::MinAge,
                    Classes::MaxAge,
                    Classes::ImageUrl,
                    Classes::IsPublished,
                ])
                .to_owned(),
        )
        .returning_col(Classes::Id)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO class_schedules (class_id, starts_at_ms, ends_at_ms, seats_total, seats_remaining)
/// VALUES (?, ?, ?, ?, ?) ON CONFLICT DO NOTHING
pub fn insert_schedule_or_ignore(
    class_id: i64,
    starts_at_ms: i64,
    ends_at_ms: i64,
    seats_total: i32,
) -> String {
    Query::insert()
        .into_table(ClassSchedules::Table)
        .columns([
            ClassSchedules::ClassId,
            ClassSchedules::StartsAtMs,
            ClassSchedules::EndsAtMs,
            ClassSchedules::SeatsTotal,
            ClassSchedules::SeatsRemaining,
        ])
        .values_panic([
            class_id.into(),
            starts_at_ms.into(),
            ends_at_ms.into(),
            seats_total.into(),
            seats_total.into(),
        ])
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .to_string(SqliteQueryBuilder)
}

/// SELECT id FROM class_schedules WHERE class_id = ? AND starts_at_ms = ?
pub fn select_schedule_id(class_id: i64, starts_at_ms: i64) -> String {
    Query::select()
        .column(ClassSchedules::Id)
        .from(ClassSchedules::Table)
        .and_where(Expr::col(ClassSchedules::ClassId).eq(class_id))
        .and_where(Expr::col(ClassSchedules::StartsAtMs).eq(starts_at_ms))
        .to_string(SqliteQueryBuilder)
}
