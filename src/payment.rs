//! Hand-off to the external payment processor
//!
//! The processor's embedded form is given the amount and booking id; card data
//! never reaches this service. The processor reports the outcome back through
//! a webhook authenticated with a shared secret.

use axum::http::HeaderMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use crate::booking::{mark_paid, require_booking, Booking, BookingStatus};
use crate::config::PaymentConfig;
use crate::error::AppError;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// Body of `POST /api/payments/webhook`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub booking_id: i64,
    pub payment_reference: String,
    pub status: PaymentOutcome,
}

/// Parameters for the processor's embedded payment form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentForm {
    pub booking_id: i64,
    pub reference: String,
    pub amount_cents: i64,
    pub currency: String,
    pub publishable_key: String,
    pub confirmation_url: String,
}

impl PaymentForm {
    pub fn for_booking(booking: &Booking, config: &PaymentConfig) -> Self {
        Self {
            booking_id: booking.id,
            reference: booking.reference.clone(),
            amount_cents: booking.amount_cents,
            currency: config.currency.clone(),
            publishable_key: config.publishable_key.clone(),
            confirmation_url: format!("/booking/{}/confirmation", booking.id),
        }
    }
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn verify_webhook_secret(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;
    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        warn!("Rejected payment webhook with a wrong secret");
        return Err(AppError::Forbidden("invalid webhook secret".to_string()));
    }
    Ok(())
}

/// Apply a processor callback to its booking
///
/// A repeated success for an already paid booking with the same payment
/// reference is accepted unchanged. A failure leaves the booking as it is.
pub async fn apply_payment_event(
    pool: &SqlitePool,
    event: &PaymentEvent,
) -> Result<Booking, AppError> {
    if event.payment_reference.trim().is_empty() {
        return Err(AppError::Validation(
            "payment_reference must not be empty".to_string(),
        ));
    }
    let booking = require_booking(pool, event.booking_id).await?;

    match event.status {
        PaymentOutcome::Succeeded => {
            if booking.status == BookingStatus::Paid
                && booking.payment_reference.as_deref() == Some(event.payment_reference.as_str())
            {
                info!(
                    "Duplicate payment confirmation for booking {}",
                    booking.id
                );
                return Ok(booking);
            }
            let result = mark_paid(pool, booking.id, &event.payment_reference).await;
            // Money was taken for a booking that can no longer be paid
            if let Err(AppError::InvalidTransition { from, .. }) = &result {
                warn!(
                    "Payment {} succeeded for booking {} which is {}; refund it manually",
                    event.payment_reference, booking.id, from
                );
            }
            result
        }
        PaymentOutcome::Failed => {
            info!(
                "Payment {} failed for booking {}; booking stays {}",
                event.payment_reference, booking.id, booking.status
            );
            Ok(booking)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_webhook_secret_check() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            verify_webhook_secret(&headers, "s3cret"),
            Err(AppError::Unauthenticated)
        ));
        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(matches!(
            verify_webhook_secret(&headers, "s3cret"),
            Err(AppError::Forbidden(_))
        ));
        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(verify_webhook_secret(&headers, "s3cret").is_ok());
    }

    #[test]
    fn test_event_parses() {
        let event: PaymentEvent = serde_json::from_str(
            r#"{"booking_id": 4, "payment_reference": "pi_9", "status": "succeeded"}"#,
        )
        .unwrap();
        assert_eq!(event.status, PaymentOutcome::Succeeded);
        assert!(serde_json::from_str::<PaymentEvent>(
            r#"{"booking_id": 4, "payment_reference": "pi_9", "status": "pending"}"#
        )
        .is_err());
    }
}
