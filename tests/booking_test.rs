//! # Booking Tests
//!
//! Seat accounting and the booking state machine against a real SQLite file:
//! concurrent reservations on the last seat, payment, cancellation and the
//! release of expired holds.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test booking_test
//! ```

use sqlx::sqlite::SqlitePool;

use crafty_kid::auth::{ensure_user, Role, Viewer};
use crafty_kid::booking::{
    cancel, mark_paid, release_expired_reservations, require_booking, reserve, BookingStatus,
};
use crafty_kid::catalog::{
    ensure_schedule, get_schedule, upsert_category, upsert_class, upsert_instructor, upsert_venue,
};
use crafty_kid::db::{create_test_connection_in_temporary_file, now_ms};
use crafty_kid::payment::{apply_payment_event, PaymentEvent, PaymentOutcome};
use crafty_kid::queries::catalog::ClassRow;
use crafty_kid::AppError;

const HOUR_MS: i64 = 3_600_000;

/// Helper to create one published class with a single future session
async fn create_class_with_session(pool: &SqlitePool, seats: i32) -> i64 {
    let category_id = upsert_category(pool, "painting", "Painting").await.unwrap();
    let venue_id = upsert_venue(pool, "Maple Hall", "1 Maple St", "Springfield")
        .await
        .unwrap();
    let instructor_id = upsert_instructor(pool, None, "Ada Brush", "Paints", None, "painting")
        .await
        .unwrap();
    let class_id = upsert_class(
        pool,
        &ClassRow {
            title: "Watercolour animals",
            description: "Paint your favourite animal",
            category_id,
            instructor_id,
            venue_id,
            price_cents: 2500,
            min_age: 6,
            max_age: 10,
            image_url: None,
            is_published: true,
        },
    )
    .await
    .unwrap();

    let starts = now_ms() + 48 * HOUR_MS;
    ensure_schedule(pool, class_id, starts, starts + HOUR_MS, seats)
        .await
        .unwrap()
}

/// Helper to register a parent the way the identity middleware would
async fn create_parent(pool: &SqlitePool, user_id: &str) -> String {
    let viewer = Viewer::with_role(user_id, Role::Parent);
    let identity = viewer.identity.unwrap();
    ensure_user(pool, &identity).await.unwrap();
    identity.user_id
}

async fn seats_remaining(pool: &SqlitePool, schedule_id: i64) -> i32 {
    get_schedule(pool, schedule_id)
        .await
        .unwrap()
        .unwrap()
        .seats_remaining
}

#[tokio::test]
async fn test_concurrent_reservations_for_last_seat() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 1).await;
    let alice = create_parent(&pool, "alice").await;
    let bob = create_parent(&pool, "bob").await;

    let (first, second) = tokio::join!(
        reserve(&pool, schedule_id, &alice),
        reserve(&pool, schedule_id, &bob)
    );

    let results = [first, second];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let capacity_errors = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::CapacityExceeded { .. })))
        .count();
    assert_eq!(successes, 1, "exactly one reservation should win");
    assert_eq!(capacity_errors, 1, "the other should see no seats");
    assert_eq!(seats_remaining(&pool, schedule_id).await, 0);
}

#[tokio::test]
async fn test_reserve_records_price_and_takes_seat() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 3).await;
    let parent = create_parent(&pool, "carol").await;

    let booking = reserve(&pool, schedule_id, &parent).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Reserved);
    assert_eq!(booking.amount_cents, 2500);
    assert_eq!(booking.parent_id, "carol");
    assert_eq!(booking.class_title, "Watercolour animals");
    assert!(!booking.reference.is_empty());
    assert_eq!(seats_remaining(&pool, schedule_id).await, 2);
}

#[tokio::test]
async fn test_reserve_unknown_schedule_is_not_found() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let parent = create_parent(&pool, "dave").await;
    let result = reserve(&pool, 9_999, &parent).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_paid_booking_cancel_becomes_refunded_and_restores_seat() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 1).await;
    let parent = create_parent(&pool, "erin").await;

    let booking = reserve(&pool, schedule_id, &parent).await.unwrap();
    assert_eq!(seats_remaining(&pool, schedule_id).await, 0);

    let paid = mark_paid(&pool, booking.id, "pi_123").await.unwrap();
    assert_eq!(paid.status, BookingStatus::Paid);
    assert_eq!(paid.payment_reference.as_deref(), Some("pi_123"));
    assert_eq!(seats_remaining(&pool, schedule_id).await, 0);

    let refunded = cancel(&pool, booking.id).await.unwrap();
    assert_eq!(refunded.status, BookingStatus::Refunded);
    assert_eq!(seats_remaining(&pool, schedule_id).await, 1);
}

#[tokio::test]
async fn test_reserved_booking_cancel_becomes_cancelled() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 2).await;
    let parent = create_parent(&pool, "frank").await;

    let booking = reserve(&pool, schedule_id, &parent).await.unwrap();
    let cancelled = cancel(&pool, booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(seats_remaining(&pool, schedule_id).await, 2);
}

#[tokio::test]
async fn test_invalid_transitions_rejected() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 2).await;
    let parent = create_parent(&pool, "gina").await;

    let booking = reserve(&pool, schedule_id, &parent).await.unwrap();
    cancel(&pool, booking.id).await.unwrap();

    // Cancelled is terminal: no payment, no second cancel
    assert!(matches!(
        mark_paid(&pool, booking.id, "pi_late").await,
        Err(AppError::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Paid,
            ..
        })
    ));
    assert!(matches!(
        cancel(&pool, booking.id).await,
        Err(AppError::InvalidTransition { .. })
    ));

    // The seat was returned exactly once
    assert_eq!(seats_remaining(&pool, schedule_id).await, 2);
}

#[tokio::test]
async fn test_release_expired_reservations() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 2).await;
    let holder = create_parent(&pool, "hank").await;
    let payer = create_parent(&pool, "iris").await;

    let held = reserve(&pool, schedule_id, &holder).await.unwrap();
    let paid = reserve(&pool, schedule_id, &payer).await.unwrap();
    mark_paid(&pool, paid.id, "pi_456").await.unwrap();
    assert_eq!(seats_remaining(&pool, schedule_id).await, 0);

    // A cutoff in the past releases nothing
    let released = release_expired_reservations(&pool, 0).await.unwrap();
    assert_eq!(released, 0);

    let released = release_expired_reservations(&pool, now_ms() + HOUR_MS)
        .await
        .unwrap();
    assert_eq!(released, 1);

    let held = require_booking(&pool, held.id).await.unwrap();
    assert_eq!(held.status, BookingStatus::Cancelled);
    let paid = require_booking(&pool, paid.id).await.unwrap();
    assert_eq!(paid.status, BookingStatus::Paid);
    assert_eq!(seats_remaining(&pool, schedule_id).await, 1);
}

#[tokio::test]
async fn test_payment_events() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 2).await;
    let parent = create_parent(&pool, "jack").await;
    let booking = reserve(&pool, schedule_id, &parent).await.unwrap();

    let failed = apply_payment_event(
        &pool,
        &PaymentEvent {
            booking_id: booking.id,
            payment_reference: "pi_fail".to_string(),
            status: PaymentOutcome::Failed,
        },
    )
    .await
    .unwrap();
    assert_eq!(failed.status, BookingStatus::Reserved);

    let success = PaymentEvent {
        booking_id: booking.id,
        payment_reference: "pi_ok".to_string(),
        status: PaymentOutcome::Succeeded,
    };
    let paid = apply_payment_event(&pool, &success).await.unwrap();
    assert_eq!(paid.status, BookingStatus::Paid);

    // Processor retries deliver the same event again
    let again = apply_payment_event(&pool, &success).await.unwrap();
    assert_eq!(again.status, BookingStatus::Paid);
    assert_eq!(again.payment_reference.as_deref(), Some("pi_ok"));

    let other_reference = apply_payment_event(
        &pool,
        &PaymentEvent {
            payment_reference: "pi_other".to_string(),
            ..success
        },
    )
    .await;
    assert!(matches!(
        other_reference,
        Err(AppError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_payment_for_cancelled_booking_is_rejected() {
    let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
    let schedule_id = create_class_with_session(&pool, 2).await;
    let parent = create_parent(&pool, "kate").await;
    let booking = reserve(&pool, schedule_id, &parent).await.unwrap();

    // The hold expired before the processor reported success
    release_expired_reservations(&pool, now_ms() + HOUR_MS)
        .await
        .unwrap();

    let late = apply_payment_event(
        &pool,
        &PaymentEvent {
            booking_id: booking.id,
            payment_reference: "pi_late".to_string(),
            status: PaymentOutcome::Succeeded,
        },
    )
    .await;
    assert!(matches!(
        late,
        Err(AppError::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Paid,
            ..
        })
    ));

    let booking = require_booking(&pool, booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert!(booking.payment_reference.is_none());
    assert_eq!(seats_remaining(&pool, schedule_id).await, 2);
}
