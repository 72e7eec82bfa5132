//! Inventory Counter: remaining ticket capacity for events.
//!
//! Capacity is never stored. Only payments with status `completed` count
//! against it; pending or failed payments do not reserve anything, so the
//! authoritative check happens again at approval time (see
//! `services::payment::process_payment`).

use std::collections::HashMap;

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Event, PaymentState};
use crate::models::event::EventWithRemaining;
use crate::utils::error::AppError;

/// Remaining capacity from a total and a sold count. `None` total means
/// unlimited; the result is clamped at zero.
pub fn remaining(total_tickets: Option<i32>, sold: i64) -> Option<i32> {
    total_tickets.map(|total| {
        let left = i64::from(total) - sold;
        left.max(0) as i32
    })
}

/// Number of completed payments against an event.
pub async fn sold_count<'e, E>(executor: E, event_id: Uuid) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payments WHERE event_id = $1 AND status = $2",
    )
    .bind(event_id)
    .bind(PaymentState::Completed.as_str())
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Same count, excluding one payment. Used as the last-checkpoint guard
/// when approving that payment itself.
pub async fn sold_count_excluding<'e, E>(
    executor: E,
    event_id: Uuid,
    payment_id: Uuid,
) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payments WHERE event_id = $1 AND status = $2 AND id <> $3",
    )
    .bind(event_id)
    .bind(PaymentState::Completed.as_str())
    .bind(payment_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

pub async fn remaining_for<'e, E>(executor: E, event: &Event) -> Result<Option<i32>, AppError>
where
    E: PgExecutor<'e>,
{
    if event.total_tickets.is_none() {
        return Ok(None);
    }
    let sold = sold_count(executor, event.id).await?;
    Ok(remaining(event.total_tickets, sold))
}

/// Batch variant for list views: one grouped count query, then a map.
pub async fn with_remaining<'e, E>(
    executor: E,
    events: Vec<Event>,
) -> Result<Vec<EventWithRemaining>, AppError>
where
    E: PgExecutor<'e>,
{
    let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();

    let counts: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT event_id, COUNT(*) FROM payments \
         WHERE event_id = ANY($1) AND status = $2 GROUP BY event_id",
    )
    .bind(&ids)
    .bind(PaymentState::Completed.as_str())
    .fetch_all(executor)
    .await?;

    let sold: HashMap<Uuid, i64> = counts.into_iter().collect();

    Ok(events
        .into_iter()
        .map(|event| {
            let sold = sold.get(&event.id).copied().unwrap_or(0);
            let remaining_tickets = remaining(event.total_tickets, sold);
            EventWithRemaining {
                event,
                remaining_tickets,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_capacity_has_no_remaining_count() {
        assert_eq!(remaining(None, 0), None);
        assert_eq!(remaining(None, 10_000), None);
    }

    #[test]
    fn remaining_subtracts_sold() {
        assert_eq!(remaining(Some(100), 40), Some(60));
        assert_eq!(remaining(Some(1), 1), Some(0));
    }

    #[test]
    fn remaining_clamps_at_zero_on_oversell() {
        // Concurrent approvals can push the sold count past capacity; the
        // derived value never goes negative.
        assert_eq!(remaining(Some(5), 7), Some(0));
    }
}
