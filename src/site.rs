use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::block::{FooterColumn, Link};
use crate::db::now_ms;
use crate::error::AppError;
use crate::queries::site as site_queries;

/// Global chrome shared by every rendered page: navbar and footer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub site_name: String,
    pub logo_url: Option<String>,
    pub nav_links: Vec<Link>,
    /// Highlighted button at the right of the navbar
    pub nav_cta: Option<Link>,
    pub footer_columns: Vec<FooterColumn>,
    pub footer_note: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Crafty Kid".to_string(),
            logo_url: None,
            nav_links: vec![
                Link::new("Classes", "/classes"),
                Link::new("Search", "/search"),
            ],
            nav_cta: None,
            footer_columns: Vec::new(),
            footer_note: String::new(),
        }
    }
}

impl SiteSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.site_name.trim().is_empty() {
            return Err(AppError::Validation("site_name must not be empty".to_string()));
        }
        let links = self
            .nav_links
            .iter()
            .chain(self.nav_cta.iter())
            .chain(self.footer_columns.iter().flat_map(|c| c.links.iter()));
        for link in links {
            if link.href.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "Link '{}' has an empty href",
                    link.label
                )));
            }
        }
        Ok(())
    }
}

/// Load the site settings, falling back to defaults when none were saved
pub async fn load_site_settings(pool: &SqlitePool) -> Result<SiteSettings, AppError> {
    let row = sqlx::query(&site_queries::select())
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let json: String = row.try_get(0)?;
            Ok(serde_json::from_str(&json)?)
        }
        None => Ok(SiteSettings::default()),
    }
}

pub async fn save_site_settings(
    pool: &SqlitePool,
    settings: &SiteSettings,
) -> Result<(), AppError> {
    settings.validate()?;
    let json = serde_json::to_string(settings)?;
    sqlx::query(&site_queries::upsert(&json, now_ms()))
        .execute(pool)
        .await?;
    Ok(())
}
