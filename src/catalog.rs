//! Marketplace entities read by the static routes: classes, schedules,
//! instructors, venues and categories

use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::AppError;
use crate::queries::catalog::{self as catalog_queries, ClassFilter, ClassRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructorProfile {
    pub id: i64,
    pub user_id: Option<String>,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    /// Comma-separated list, e.g. "pottery, weaving"
    pub specialties: String,
}

impl InstructorProfile {
    pub fn specialty_list(&self) -> Vec<&str> {
        self.specialties
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            display_name: row.try_get("display_name")?,
            bio: row.try_get("bio")?,
            avatar_url: row.try_get("avatar_url")?,
            specialties: row.try_get("specialties")?,
        })
    }
}

/// A class joined with its category, instructor and venue names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub category_slug: String,
    pub category_name: String,
    pub instructor_id: i64,
    pub instructor_name: String,
    pub venue_id: i64,
    pub venue_name: String,
    pub city: String,
}

impl ClassSummary {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price_cents: row.try_get("price_cents")?,
            min_age: row.try_get("min_age")?,
            max_age: row.try_get("max_age")?,
            image_url: row.try_get("image_url")?,
            is_published: row.try_get::<i32, _>("is_published")? != 0,
            category_slug: row.try_get("category_slug")?,
            category_name: row.try_get("category_name")?,
            instructor_id: row.try_get("instructor_id")?,
            instructor_name: row.try_get("instructor_name")?,
            venue_id: row.try_get("venue_id")?,
            venue_name: row.try_get("venue_name")?,
            city: row.try_get("city")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSchedule {
    pub id: i64,
    pub class_id: i64,
    pub starts_at_ms: i64,
    pub ends_at_ms: i64,
    pub seats_total: i32,
    pub seats_remaining: i32,
}

impl ClassSchedule {
    pub fn is_full(&self) -> bool {
        self.seats_remaining <= 0
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            class_id: row.try_get("class_id")?,
            starts_at_ms: row.try_get("starts_at_ms")?,
            ends_at_ms: row.try_get("ends_at_ms")?,
            seats_total: row.try_get("seats_total")?,
            seats_remaining: row.try_get("seats_remaining")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDetail {
    pub class: ClassSummary,
    pub venue: Venue,
    pub schedules: Vec<ClassSchedule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructorDetail {
    pub profile: InstructorProfile,
    pub classes: Vec<ClassSummary>,
}

pub async fn list_classes(
    pool: &SqlitePool,
    filter: &ClassFilter<'_>,
) -> Result<Vec<ClassSummary>, AppError> {
    let rows = sqlx::query(&catalog_queries::select_class_summaries(filter))
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(ClassSummary::from_row)
        .collect::<Result<_, _>>()?)
}

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>, AppError> {
    let rows = sqlx::query(&catalog_queries::select_categories())
        .fetch_all(pool)
        .await?;
    let mut categories = Vec::with_capacity(rows.len());
    for row in rows {
        categories.push(Category {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
        });
    }
    Ok(categories)
}

/// Class page data; unpublished classes are only returned when `include_unpublished`
pub async fn get_class_detail(
    pool: &SqlitePool,
    class_id: i64,
    include_unpublished: bool,
    now_ms: i64,
) -> Result<ClassDetail, AppError> {
    let filter = ClassFilter {
        class_id: Some(class_id),
        published_only: !include_unpublished,
        ..Default::default()
    };
    let class = list_classes(pool, &filter)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("class {}", class_id)))?;

    let row = sqlx::query(&catalog_queries::select_venue_by_id(class.venue_id))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("venue {}", class.venue_id)))?;
    let venue = Venue {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
    };

    let rows = sqlx::query(&catalog_queries::select_upcoming_schedules(class_id, now_ms))
        .fetch_all(pool)
        .await?;
    let schedules = rows
        .iter()
        .map(ClassSchedule::from_row)
        .collect::<Result<_, _>>()?;

    Ok(ClassDetail {
        class,
        venue,
        schedules,
    })
}

pub async fn get_instructor_detail(
    pool: &SqlitePool,
    instructor_id: i64,
) -> Result<InstructorDetail, AppError> {
    let row = sqlx::query(&catalog_queries::select_instructor_by_id(instructor_id))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("instructor {}", instructor_id)))?;
    let profile = InstructorProfile::from_row(&row)?;

    let classes = list_classes(
        pool,
        &ClassFilter {
            instructor_id: Some(instructor_id),
            published_only: true,
            ..Default::default()
        },
    )
    .await?;

    Ok(InstructorDetail { profile, classes })
}

pub async fn search_instructors(
    pool: &SqlitePool,
    text: &str,
    limit: u64,
) -> Result<Vec<InstructorProfile>, AppError> {
    let rows = sqlx::query(&catalog_queries::select_instructors_matching(text, limit))
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(InstructorProfile::from_row)
        .collect::<Result<_, _>>()?)
}

pub async fn get_schedule(
    pool: &SqlitePool,
    schedule_id: i64,
) -> Result<Option<ClassSchedule>, AppError> {
    let row = sqlx::query(&catalog_queries::select_schedule_by_id(schedule_id))
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(ClassSchedule::from_row).transpose()?)
}

// ============================================================================
// Writes used by the seed command; each is an upsert keyed on a natural key
// ============================================================================

async fn fetch_returned_id(pool: &SqlitePool, sql: &str) -> Result<i64, AppError> {
    let row = sqlx::query(sql).fetch_one(pool).await?;
    Ok(row.try_get(0)?)
}

pub async fn upsert_category(pool: &SqlitePool, slug: &str, name: &str) -> Result<i64, AppError> {
    fetch_returned_id(pool, &catalog_queries::upsert_category(slug, name)).await
}

pub async fn upsert_venue(
    pool: &SqlitePool,
    name: &str,
    address: &str,
    city: &str,
) -> Result<i64, AppError> {
    fetch_returned_id(pool, &catalog_queries::upsert_venue(name, address, city)).await
}

pub async fn upsert_instructor(
    pool: &SqlitePool,
    user_id: Option<&str>,
    display_name: &str,
    bio: &str,
    avatar_url: Option<&str>,
    specialties: &str,
) -> Result<i64, AppError> {
    let sql =
        catalog_queries::upsert_instructor(user_id, display_name, bio, avatar_url, specialties);
    fetch_returned_id(pool, &sql).await
}

pub async fn upsert_class(pool: &SqlitePool, row: &ClassRow<'_>) -> Result<i64, AppError> {
    if row.min_age > row.max_age {
        return Err(AppError::Validation(format!(
            "Class '{}' has min_age {} above max_age {}",
            row.title, row.min_age, row.max_age
        )));
    }
    if row.price_cents < 0 {
        return Err(AppError::Validation(format!(
            "Class '{}' has a negative price",
            row.title
        )));
    }
    fetch_returned_id(pool, &catalog_queries::upsert_class(row)).await
}

/// Create the session unless one already starts at the same time; returns its id
pub async fn ensure_schedule(
    pool: &SqlitePool,
    class_id: i64,
    starts_at_ms: i64,
    ends_at_ms: i64,
    seats_total: i32,
) -> Result<i64, AppError> {
    if seats_total <= 0 {
        return Err(AppError::Validation("seats_total must be positive".to_string()));
    }
    if ends_at_ms <= starts_at_ms {
        return Err(AppError::Validation(
            "A session must end after it starts".to_string(),
        ));
    }
    sqlx::query(&catalog_queries::insert_schedule_or_ignore(
        class_id,
        starts_at_ms,
        ends_at_ms,
        seats_total,
    ))
    .execute(pool)
    .await?;
    fetch_returned_id(pool, &catalog_queries::select_schedule_id(class_id, starts_at_ms)).await
}

/// Format cents as a price string, e.g. 2500 -> "$25.00"
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(2500), "$25.00");
        assert_eq!(format_price(1999), "$19.99");
        assert_eq!(format_price(5), "$0.05");
        assert_eq!(format_price(-150), "-$1.50");
    }

    #[test]
    fn test_specialty_list() {
        let profile = InstructorProfile {
            id: 1,
            user_id: None,
            display_name: "Mia".to_string(),
            bio: String::new(),
            avatar_url: None,
            specialties: " pottery, ,weaving ".to_string(),
        };
        assert_eq!(profile.specialty_list(), vec!["pottery", "weaving"]);
    }
}
