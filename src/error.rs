use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use std::fmt;

use crate::booking::BookingStatus;

/// Errors surfaced by request handlers and the storage layer
#[derive(Debug)]
pub enum AppError {
    /// Missing page, class, booking, instructor or schedule
    NotFound(String),
    /// No identity was forwarded by the identity provider
    Unauthenticated,
    /// Identity present but lacking the required role or ownership
    Forbidden(String),
    /// Plain create on a slug that already exists
    DuplicateSlug(String),
    /// No seats left on the schedule
    CapacityExceeded { schedule_id: i64 },
    /// Booking state machine rejected the move
    InvalidTransition {
        booking_id: i64,
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Editor operation referenced a block id not in the list
    BlockNotFound(String),
    /// Malformed request input
    Validation(String),
    /// Storage failure
    Database(sqlx::Error),
    /// JSON column could not be encoded or decoded
    Serialization(serde_json::Error),
    /// A stored value is outside what the schema allows
    CorruptData(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(what) => write!(f, "Not found: {}", what),
            AppError::Unauthenticated => write!(f, "Authentication required"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::DuplicateSlug(slug) => {
                write!(f, "A page with slug '{}' already exists", slug)
            }
            AppError::CapacityExceeded { schedule_id } => {
                write!(f, "Schedule {} has no seats remaining", schedule_id)
            }
            AppError::InvalidTransition {
                booking_id,
                from,
                to,
            } => write!(
                f,
                "Booking {} cannot move from {} to {}",
                booking_id, from, to
            ),
            AppError::BlockNotFound(id) => write!(f, "Block '{}' not found", id),
            AppError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::Serialization(err) => write!(f, "Serialization error: {}", err),
            AppError::CorruptData(msg) => write!(f, "Corrupt stored data: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Database(err) => Some(err),
            AppError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err)
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::BlockNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DuplicateSlug(_)
            | AppError::CapacityExceeded { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Serialization(_) | AppError::CorruptData(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether a sqlx error is a UNIQUE constraint violation
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// JSON error body: `{"error": "..."}`
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("page 'x'".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::CapacityExceeded { schedule_id: 1 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DuplicateSlug("faq".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::CorruptData("page 3 has status 'bogus'".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_display() {
        let err = AppError::InvalidTransition {
            booking_id: 7,
            from: BookingStatus::Cancelled,
            to: BookingStatus::Paid,
        };
        assert_eq!(err.to_string(), "Booking 7 cannot move from CANCELLED to PAID");

        let err = AppError::DuplicateSlug("faq".into());
        assert!(err.to_string().contains("faq"));
    }
}
