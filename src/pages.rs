//! Page records: slug-addressed documents holding an ordered block list

use log::info;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

use crate::block::{block_list_to_json, parse_block_list, BlockInstance};
use crate::constants::is_valid_slug;
use crate::db::now_ms;
use crate::error::AppError;
use crate::queries::pages::{self as page_queries, PageRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
    /// Becomes public once `publish_at_ms` has passed
    Scheduled,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
            PageStatus::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PageStatus::Draft),
            "published" => Ok(PageStatus::Published),
            "scheduled" => Ok(PageStatus::Scheduled),
            other => Err(format!("Unknown page status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Seo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: PageStatus,
    pub seo: Seo,
    pub publish_at_ms: Option<i64>,
    pub blocks: Vec<BlockInstance>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Page {
    /// Whether anonymous visitors may see this page at `now_ms`
    pub fn is_publicly_visible(&self, now_ms: i64) -> bool {
        match self.status {
            PageStatus::Published => true,
            PageStatus::Draft => false,
            PageStatus::Scheduled => self.publish_at_ms.is_some_and(|at| at <= now_ms),
        }
    }

    fn from_row(row: &SqliteRow) -> Result<Self, AppError> {
        let status: String = row.try_get("status")?;
        let status = status.parse::<PageStatus>().map_err(AppError::CorruptData)?;
        let seo: String = row.try_get("seo")?;
        let blocks: String = row.try_get("blocks")?;
        Ok(Page {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            status,
            seo: serde_json::from_str(&seo)?,
            publish_at_ms: row.try_get("publish_at_ms")?,
            blocks: parse_block_list(&blocks)?,
            created_at_ms: row.try_get("created_at_ms")?,
            updated_at_ms: row.try_get("updated_at_ms")?,
        })
    }
}

/// Input for creating or upserting a page
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub seo: Seo,
    #[serde(default)]
    pub publish_at_ms: Option<i64>,
    #[serde(default)]
    pub blocks: Vec<BlockInstance>,
}

/// Metadata update from the admin: everything except the block list
#[derive(Debug, Clone, Deserialize)]
pub struct PageMetaUpdate {
    pub title: Option<String>,
    pub status: Option<PageStatus>,
    pub seo: Option<Seo>,
    pub publish_at_ms: Option<i64>,
    /// Drop any publish time; wins over `publish_at_ms`
    #[serde(default)]
    pub clear_publish_at: bool,
}

fn validate_new_page(page: &NewPage) -> Result<(), AppError> {
    if !is_valid_slug(&page.slug) {
        return Err(AppError::Validation(format!(
            "Invalid slug '{}': use lowercase letters, digits and dashes",
            page.slug
        )));
    }
    if page.title.trim().is_empty() {
        return Err(AppError::Validation("Page title must not be empty".to_string()));
    }
    if page.status == PageStatus::Scheduled && page.publish_at_ms.is_none() {
        return Err(AppError::Validation(
            "Scheduled pages need publish_at_ms".to_string(),
        ));
    }
    Ok(())
}

pub async fn get_page(pool: &SqlitePool, slug: &str) -> Result<Option<Page>, AppError> {
    let row = sqlx::query(&page_queries::select_by_slug(slug))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(Page::from_row).transpose()
}

/// Like [`get_page`] but a missing page is an error
pub async fn require_page(pool: &SqlitePool, slug: &str) -> Result<Page, AppError> {
    get_page(pool, slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("page '{}'", slug)))
}

pub async fn list_pages(pool: &SqlitePool) -> Result<Vec<Page>, AppError> {
    let rows = sqlx::query(&page_queries::select_all())
        .fetch_all(pool)
        .await?;
    rows.iter().map(Page::from_row).collect()
}

/// Insert a new page; a duplicate slug fails with [`AppError::DuplicateSlug`]
pub async fn create_page(pool: &SqlitePool, page: &NewPage) -> Result<Page, AppError> {
    validate_new_page(page)?;
    let seo_json = serde_json::to_string(&page.seo)?;
    let blocks_json = block_list_to_json(&page.blocks)?;
    let row = PageRow {
        slug: &page.slug,
        title: &page.title,
        status: page.status.as_str(),
        seo_json: &seo_json,
        publish_at_ms: page.publish_at_ms,
        blocks_json: &blocks_json,
        now_ms: now_ms(),
    };

    match sqlx::query(&page_queries::insert(&row)).execute(pool).await {
        Ok(_) => {}
        Err(e) if AppError::is_unique_violation(&e) => {
            return Err(AppError::DuplicateSlug(page.slug.clone()))
        }
        Err(e) => return Err(e.into()),
    }

    info!("Created page '{}' ({} blocks)", page.slug, page.blocks.len());
    require_page(pool, &page.slug).await
}

/// Insert or replace a page by slug (used by the seed command)
pub async fn upsert_page(pool: &SqlitePool, page: &NewPage) -> Result<Page, AppError> {
    validate_new_page(page)?;
    let seo_json = serde_json::to_string(&page.seo)?;
    let blocks_json = block_list_to_json(&page.blocks)?;
    let row = PageRow {
        slug: &page.slug,
        title: &page.title,
        status: page.status.as_str(),
        seo_json: &seo_json,
        publish_at_ms: page.publish_at_ms,
        blocks_json: &blocks_json,
        now_ms: now_ms(),
    };
    sqlx::query(&page_queries::upsert_by_slug(&row))
        .execute(pool)
        .await?;
    require_page(pool, &page.slug).await
}

/// Overwrite the whole block list in one write (last writer wins)
pub async fn save_blocks(
    pool: &SqlitePool,
    slug: &str,
    blocks: &[BlockInstance],
) -> Result<Page, AppError> {
    let blocks_json = block_list_to_json(blocks)?;
    let result = sqlx::query(&page_queries::update_blocks(slug, &blocks_json, now_ms()))
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("page '{}'", slug)));
    }
    info!("Saved {} blocks on page '{}'", blocks.len(), slug);
    require_page(pool, slug).await
}

pub async fn update_page_meta(
    pool: &SqlitePool,
    slug: &str,
    update: &PageMetaUpdate,
) -> Result<Page, AppError> {
    let current = require_page(pool, slug).await?;

    let title = update.title.clone().unwrap_or(current.title);
    if title.trim().is_empty() {
        return Err(AppError::Validation("Page title must not be empty".to_string()));
    }
    let status = update.status.unwrap_or(current.status);
    let seo = update.seo.clone().unwrap_or(current.seo);
    let publish_at_ms = if update.clear_publish_at {
        None
    } else {
        update.publish_at_ms.or(current.publish_at_ms)
    };
    if status == PageStatus::Scheduled && publish_at_ms.is_none() {
        return Err(AppError::Validation(
            "Scheduled pages need publish_at_ms".to_string(),
        ));
    }

    let seo_json = serde_json::to_string(&seo)?;
    sqlx::query(&page_queries::update_meta(
        slug,
        &title,
        status.as_str(),
        &seo_json,
        publish_at_ms,
        now_ms(),
    ))
    .execute(pool)
    .await?;
    require_page(pool, slug).await
}
