use sea_query::{Expr, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};

use crate::schema::Pages;

/// Column values for a page write
pub struct PageRow<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub status: &'a str,
    pub seo_json: &'a str,
    pub publish_at_ms: Option<i64>,
    pub blocks_json: &'a str,
    pub now_ms: i64,
}

fn select_columns() -> SelectStatement {
    Query::select()
        .columns([
            Pages::Id,
            Pages::Slug,
            Pages::Title,
            Pages::Status,
            Pages::Seo,
            Pages::PublishAtMs,
            Pages::Blocks,
            Pages::CreatedAtMs,
            Pages::UpdatedAtMs,
        ])
        .from(Pages::Table)
        .to_owned()
}

/// SELECT id, slug, title, status, seo, publish_at_ms, blocks, created_at_ms, updated_at_ms
/// FROM pages WHERE slug = ?
pub fn select_by_slug(slug: &str) -> String {
    select_columns()
        .and_where(Expr::col(Pages::Slug).eq(slug))
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM pages ORDER BY slug
pub fn select_all() -> String {
    select_columns()
        .order_by(Pages::Slug, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO pages (slug, title, status, seo, publish_at_ms, blocks, created_at_ms, updated_at_ms)
/// VALUES (...)
pub fn insert(row: &PageRow<'_>) -> String {
    Query::insert()
        .into_table(Pages::Table)
        .columns([
            Pages::Slug,
            Pages::Title,
            Pages::Status,
            Pages::Seo,
            Pages::PublishAtMs,
            Pages::Blocks,
            Pages::CreatedAtMs,
            Pages::UpdatedAtMs,
        ])
        .values_panic([
            row.slug.into(),
            row.title.into(),
            row.status.into(),
            row.seo_json.into(),
            row.publish_at_ms.into(),
            row.blocks_json.into(),
            row.now_ms.into(),
            row.now_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO pages (...) VALUES (...)
/// ON CONFLICT (slug) DO UPDATE SET title, status, seo, publish_at_ms, blocks, updated_at_ms
pub fn upsert_by_slug(row: &PageRow<'_>) -> String {
    Query::insert()
        .into_table(Pages::Table)
        .columns([
            Pages::Slug,
            Pages::Title,
            Pages::Status,
            Pages::Seo,
            Pages::PublishAtMs,
            Pages::Blocks,
            Pages::CreatedAtMs,
            Pages::UpdatedAtMs,
        ])
        .values_panic([
            row.slug.into(),
            row.title.into(),
            row.status.into(),
            row.seo_json.into(),
            row.publish_at_ms.into(),
            row.blocks_json.into(),
            row.now_ms.into(),
            row.now_ms.into(),
        ])
        .on_conflict(
            OnConflict::column(Pages::Slug)
                .update_columns([
                    Pages::Title,
                    Pages::Status,
                    Pages::Seo,
                    Pages::PublishAtMs,
                    Pages::Blocks,
                    Pages::UpdatedAtMs,
                ])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

/// UPDATE pages SET blocks = ?, updated_at_ms = ? WHERE slug = ?
pub fn update_blocks(slug: &str, blocks_json: &str, now_ms: i64) -> String {
    Query::update()
        .table(Pages::Table)
        .value(Pages::Blocks, blocks_json)
        .value(Pages::UpdatedAtMs, now_ms)
        .and_where(Expr::col(Pages::Slug).eq(slug))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE pages SET title = ?, status = ?, seo = ?, publish_at_ms = ?, updated_at_ms = ? WHERE slug = ?
pub fn update_meta(
    slug: &str,
    title: &str,
    status: &str,
    seo_json: &str,
    publish_at_ms: Option<i64>,
    now_ms: i64,
) -> String {
    Query::update()
        .table(Pages::Table)
        .value(Pages::Title, title)
        .value(Pages::Status, status)
        .value(Pages::Seo, seo_json)
        .value(Pages::PublishAtMs, publish_at_ms)
        .value(Pages::UpdatedAtMs, now_ms)
        .and_where(Expr::col(Pages::Slug).eq(slug))
        .to_string(SqliteQueryBuilder)
}
