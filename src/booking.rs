//! Booking state machine
//!
//! ```text
//! RESERVED --paid--> PAID --cancel--> REFUNDED
//!     |
//!     +----cancel / hold expired----> CANCELLED
//! ```
//!
//! Reserving takes one seat with a conditional update inside a transaction, so
//! concurrent reservations for the last seat cannot both succeed. Leaving
//! RESERVED or PAID through cancellation gives the seat back.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

use crate::catalog::get_schedule;
use crate::constants::generate_booking_reference;
use crate::db::now_ms;
use crate::error::AppError;
use crate::queries::bookings as booking_queries;
use crate::queries::catalog as catalog_queries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Reserved,
    Paid,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Reserved => "RESERVED",
            BookingStatus::Paid => "PAID",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Refunded => "REFUNDED",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Reserved, BookingStatus::Paid)
                | (BookingStatus::Reserved, BookingStatus::Cancelled)
                | (BookingStatus::Paid, BookingStatus::Refunded)
        )
    }

    /// Where a cancellation request leads from this state
    pub fn cancellation_target(&self) -> Option<BookingStatus> {
        match self {
            BookingStatus::Reserved => Some(BookingStatus::Cancelled),
            BookingStatus::Paid => Some(BookingStatus::Refunded),
            BookingStatus::Cancelled | BookingStatus::Refunded => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(BookingStatus::Reserved),
            "PAID" => Ok(BookingStatus::Paid),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "REFUNDED" => Ok(BookingStatus::Refunded),
            other => Err(format!("Unknown booking status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: i64,
    /// Short code shown to the parent and passed to the payment processor
    pub reference: String,
    pub schedule_id: i64,
    pub parent_id: String,
    pub status: BookingStatus,
    pub amount_cents: i64,
    pub payment_reference: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub class_id: i64,
    pub class_title: String,
    pub starts_at_ms: i64,
}

impl Booking {
    fn from_row(row: &SqliteRow) -> Result<Self, AppError> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            reference: row.try_get("reference")?,
            schedule_id: row.try_get("schedule_id")?,
            parent_id: row.try_get("parent_id")?,
            status: status.parse().map_err(AppError::CorruptData)?,
            amount_cents: row.try_get("amount_cents")?,
            payment_reference: row.try_get("payment_reference")?,
            created_at_ms: row.try_get("created_at_ms")?,
            updated_at_ms: row.try_get("updated_at_ms")?,
            class_id: row.try_get("class_id")?,
            class_title: row.try_get("title")?,
            starts_at_ms: row.try_get("starts_at_ms")?,
        })
    }
}

pub async fn get_booking(pool: &SqlitePool, booking_id: i64) -> Result<Option<Booking>, AppError> {
    let row = sqlx::query(&booking_queries::select_by_id(booking_id))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(Booking::from_row).transpose()
}

pub async fn require_booking(pool: &SqlitePool, booking_id: i64) -> Result<Booking, AppError> {
    get_booking(pool, booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", booking_id)))
}

/// Hold one seat on `schedule_id` for `parent_id` and create a RESERVED booking
///
/// The parent must already exist in the users table.
pub async fn reserve(
    pool: &SqlitePool,
    schedule_id: i64,
    parent_id: &str,
) -> Result<Booking, AppError> {
    let now = now_ms();
    let schedule = get_schedule(pool, schedule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("schedule {}", schedule_id)))?;
    if schedule.starts_at_ms <= now {
        return Err(AppError::Validation(format!(
            "Schedule {} has already started",
            schedule_id
        )));
    }

    // First statement is the write so the transaction takes the write lock up front
    let mut tx = pool.begin().await?;
    let taken = sqlx::query(&booking_queries::take_seat(schedule_id))
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if taken == 0 {
        let exists = sqlx::query(&catalog_queries::select_schedule_by_id(schedule_id))
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        tx.rollback().await?;
        return Err(if exists {
            AppError::CapacityExceeded { schedule_id }
        } else {
            AppError::NotFound(format!("schedule {}", schedule_id))
        });
    }

    let amount_cents: i64 = sqlx::query(&booking_queries::select_price_for_schedule(schedule_id))
        .fetch_one(&mut *tx)
        .await?
        .try_get(0)?;

    let reference = generate_booking_reference();
    let booking_id: i64 = sqlx::query(&booking_queries::insert(
        &reference,
        schedule_id,
        parent_id,
        BookingStatus::Reserved.as_str(),
        amount_cents,
        now,
    ))
    .fetch_one(&mut *tx)
    .await?
    .try_get(0)?;
    tx.commit().await?;

    info!(
        "Reserved booking {} ({}) on schedule {} for {}",
        booking_id, reference, schedule_id, parent_id
    );
    require_booking(pool, booking_id).await
}

/// Move `booking_id` from `from` to `to`, optionally returning its seat
///
/// The status update is compare-and-set; a concurrent move surfaces as
/// [`AppError::InvalidTransition`] from whatever state won.
async fn transition(
    pool: &SqlitePool,
    booking_id: i64,
    from: BookingStatus,
    to: BookingStatus,
    payment_reference: Option<&str>,
) -> Result<Booking, AppError> {
    if !from.can_transition_to(to) {
        return Err(AppError::InvalidTransition {
            booking_id,
            from,
            to,
        });
    }

    let mut tx = pool.begin().await?;
    let updated = sqlx::query(&booking_queries::update_status(
        booking_id,
        from.as_str(),
        to.as_str(),
        payment_reference,
        now_ms(),
    ))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        let current = require_booking(pool, booking_id).await?;
        return Err(AppError::InvalidTransition {
            booking_id,
            from: current.status,
            to,
        });
    }

    if to.is_terminal() {
        let booking = sqlx::query(&booking_queries::select_by_id(booking_id))
            .fetch_one(&mut *tx)
            .await?;
        let schedule_id: i64 = booking.try_get("schedule_id")?;
        let returned = sqlx::query(&booking_queries::return_seat(schedule_id))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if returned == 0 {
            warn!(
                "Schedule {} already at full capacity while releasing booking {}",
                schedule_id, booking_id
            );
        }
    }
    tx.commit().await?;

    info!("Booking {} moved {} -> {}", booking_id, from, to);
    require_booking(pool, booking_id).await
}

/// Payment confirmed by the processor: RESERVED -> PAID
pub async fn mark_paid(
    pool: &SqlitePool,
    booking_id: i64,
    payment_reference: &str,
) -> Result<Booking, AppError> {
    let current = require_booking(pool, booking_id).await?;
    transition(
        pool,
        booking_id,
        current.status,
        BookingStatus::Paid,
        Some(payment_reference),
    )
    .await
}

/// RESERVED -> CANCELLED or PAID -> REFUNDED, returning the seat
pub async fn cancel(pool: &SqlitePool, booking_id: i64) -> Result<Booking, AppError> {
    let current = require_booking(pool, booking_id).await?;
    let target = current
        .status
        .cancellation_target()
        .ok_or(AppError::InvalidTransition {
            booking_id,
            from: current.status,
            to: BookingStatus::Cancelled,
        })?;
    transition(pool, booking_id, current.status, target, None).await
}

/// Cancel RESERVED bookings created before `cutoff_ms` and return their seats
///
/// Returns how many bookings were released. A booking paid in the meantime is
/// skipped rather than treated as an error.
pub async fn release_expired_reservations(
    pool: &SqlitePool,
    cutoff_ms: i64,
) -> Result<u64, AppError> {
    let rows = sqlx::query(&booking_queries::select_ids_by_status_created_before(
        BookingStatus::Reserved.as_str(),
        cutoff_ms,
    ))
    .fetch_all(pool)
    .await?;

    let mut released = 0;
    for row in rows {
        let booking_id: i64 = row.try_get(0)?;
        match transition(
            pool,
            booking_id,
            BookingStatus::Reserved,
            BookingStatus::Cancelled,
            None,
        )
        .await
        {
            Ok(_) => released += 1,
            Err(AppError::InvalidTransition { from, .. }) => {
                info!(
                    "Skipping expired reservation {}: already {}",
                    booking_id, from
                );
            }
            Err(e) => return Err(e),
        }
    }

    if released > 0 {
        info!("Released {} expired reservation(s)", released);
    }
    Ok(released)
}
