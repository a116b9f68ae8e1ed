use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use crate::catalog::{list_classes, search_instructors, ClassSummary, InstructorProfile};
use crate::constants::SEARCH_RESULT_LIMIT;
use crate::error::AppError;
use crate::queries::catalog::ClassFilter;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub classes: Vec<ClassSummary>,
    pub instructors: Vec<InstructorProfile>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.instructors.is_empty()
    }
}

/// Case-insensitive substring search over published classes and instructors
///
/// The query is trimmed first; an empty query returns empty lists without
/// touching the database.
pub async fn search(pool: &SqlitePool, query: &str) -> Result<SearchResults, AppError> {
    let text = query.trim();
    if text.is_empty() {
        return Ok(SearchResults::default());
    }

    let classes = list_classes(
        pool,
        &ClassFilter {
            text: Some(text),
            published_only: true,
            limit: Some(SEARCH_RESULT_LIMIT),
            ..Default::default()
        },
    )
    .await?;
    let instructors = search_instructors(pool, text, SEARCH_RESULT_LIMIT).await?;

    Ok(SearchResults {
        classes,
        instructors,
    })
}
