use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::{Bookings, ClassSchedules, Classes};

/// UPDATE class_schedules SET seats_remaining = seats_remaining - 1
/// WHERE id = ? AND seats_remaining > 0
///
/// Zero rows affected means the schedule is full (or missing).
pub fn take_seat(schedule_id: i64) -> String {
    Query::update()
        .table(ClassSchedules::Table)
        .value(
            ClassSchedules::SeatsRemaining,
            Expr::col(ClassSchedules::SeatsRemaining).sub(1),
        )
        .and_where(Expr::col(ClassSchedules::Id).eq(schedule_id))
        .and_where(Expr::col(ClassSchedules::SeatsRemaining).gt(0))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE class_schedules SET seats_remaining = seats_remaining + 1
/// WHERE id = ? AND seats_remaining < seats_total
pub fn return_seat(schedule_id: i64) -> String {
    Query::update()
        .table(ClassSchedules::Table)
        .value(
            ClassSchedules::SeatsRemaining,
            Expr::col(ClassSchedules::SeatsRemaining).add(1),
        )
        .and_where(Expr::col(ClassSchedules::Id).eq(schedule_id))
        .and_where(
            Expr::col(ClassSchedules::SeatsRemaining).lt(Expr::col(ClassSchedules::SeatsTotal)),
        )
        .to_string(SqliteQueryBuilder)
}

/// SELECT classes.price_cents FROM class_schedules JOIN classes ON ... WHERE class_schedules.id = ?
pub fn select_price_for_schedule(schedule_id: i64) -> String {
    Query::select()
        .column((Classes::Table, Classes::PriceCents))
        .from(ClassSchedules::Table)
        .inner_join(
            Classes::Table,
            Expr::col((ClassSchedules::Table, ClassSchedules::ClassId))
                .equals((Classes::Table, Classes::Id)),
        )
        .and_where(Expr::col((ClassSchedules::Table, ClassSchedules::Id)).eq(schedule_id))
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO bookings (reference, schedule_id, parent_id, status, amount_cents, created_at_ms, updated_at_ms)
/// VALUES (...) RETURNING id
pub fn insert(
    reference: &str,
    schedule_id: i64,
    parent_id: &str,
    status: &str,
    amount_cents: i64,
    now_ms: i64,
) -> String {
    Query::insert()
        .into_table(Bookings::Table)
        .columns([
            Bookings::Reference,
            Bookings::ScheduleId,
            Bookings::ParentId,
            Bookings::Status,
            Bookings::AmountCents,
            Bookings::CreatedAtMs,
            Bookings::UpdatedAtMs,
        ])
        .values_panic([
            reference.into(),
            schedule_id.into(),
            parent_id.into(),
            status.into(),
            amount_cents.into(),
            now_ms.into(),
            now_ms.into(),
        ])
        .returning_col(Bookings::Id)
        .to_string(SqliteQueryBuilder)
}

/// SELECT bookings.*, class_schedules.class_id, class_schedules.starts_at_ms, classes.title
/// FROM bookings JOIN class_schedules JOIN classes WHERE bookings.id = ?
pub fn select_by_id(id: i64) -> String {
    Query::select()
        .columns([
            (Bookings::Table, Bookings::Id),
            (Bookings::Table, Bookings::Reference),
            (Bookings::Table, Bookings::ScheduleId),
            (Bookings::Table, Bookings::ParentId),
            (Bookings::Table, Bookings::Status),
            (Bookings::Table, Bookings::AmountCents),
            (Bookings::Table, Bookings::PaymentReference),
            (Bookings::Table, Bookings::CreatedAtMs),
            (Bookings::Table, Bookings::UpdatedAtMs),
        ])
        .column((ClassSchedules::Table, ClassSchedules::ClassId))
        .column((ClassSchedules::Table, ClassSchedules::StartsAtMs))
        .column((Classes::Table, Classes::Title))
        .from(Bookings::Table)
        .inner_join(
            ClassSchedules::Table,
            Expr::col((Bookings::Table, Bookings::ScheduleId))
                .equals((ClassSchedules::Table, ClassSchedules::Id)),
        )
        .inner_join(
            Classes::Table,
            Expr::col((ClassSchedules::Table, ClassSchedules::ClassId))
                .equals((Classes::Table, Classes::Id)),
        )
        .and_where(Expr::col((Bookings::Table, Bookings::Id)).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE bookings SET status = ?, updated_at_ms = ? [, payment_reference = ?]
/// WHERE id = ? AND status = ?
///
/// Compare-and-set on the current status; zero rows affected means another
/// writer moved the booking first.
pub fn update_status(
    id: i64,
    from_status: &str,
    to_status: &str,
    payment_reference: Option<&str>,
    now_ms: i64,
) -> String {
    let mut query = Query::update();
    query
        .table(Bookings::Table)
        .value(Bookings::Status, to_status)
        .value(Bookings::UpdatedAtMs, now_ms);
    if let Some(reference) = payment_reference {
        query.value(Bookings::PaymentReference, reference);
    }
    query
        .and_where(Expr::col(Bookings::Id).eq(id))
        .and_where(Expr::col(Bookings::Status).eq(from_status))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id FROM bookings WHERE status = ? AND created_at_ms < ? ORDER BY id
pub fn select_ids_by_status_created_before(status: &str, cutoff_ms: i64) -> String {
    Query::select()
        .column(Bookings::Id)
        .from(Bookings::Table)
        .and_where(Expr::col(Bookings::Status).eq(status))
        .and_where(Expr::col(Bookings::CreatedAtMs).lt(cutoff_ms))
        .order_by(Bookings::Id, Order::Asc)
        .to_string(SqliteQueryBuilder)
}
