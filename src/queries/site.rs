use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};

use crate::schema::SiteSettings;

/// The site settings table holds exactly one row with this id
pub const SITE_SETTINGS_ROW_ID: i64 = 1;

/// SELECT settings FROM site_settings WHERE id = 1
pub fn select() -> String {
    Query::select()
        .column(SiteSettings::Settings)
        .from(SiteSettings::Table)
        .and_where(Expr::col(SiteSettings::Id).eq(SITE_SETTINGS_ROW_ID))
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO site_settings (id, settings, updated_at_ms) VALUES (1, ?, ?)
/// ON CONFLICT (id) DO UPDATE SET settings, updated_at_ms
pub fn upsert(settings_json: &str, now_ms: i64) -> String {
    Query::insert()
        .into_table(SiteSettings::Table)
        .columns([
            SiteSettings::Id,
            SiteSettings::Settings,
            SiteSettings::UpdatedAtMs,
        ])
        .values_panic([
            SITE_SETTINGS_ROW_ID.into(),
            settings_json.into(),
            now_ms.into(),
        ])
        .on_conflict(
            OnConflict::column(SiteSettings::Id)
                .update_columns([SiteSettings::Settings, SiteSettings::UpdatedAtMs])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}
