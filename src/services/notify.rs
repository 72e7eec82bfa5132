//! Notification and audit fan-out.
//!
//! Callers address a target, not a recipient list: `User(id)` for one
//! account, `Admins` to broadcast to every active admin. The broadcast is a
//! single `INSERT .. SELECT`, so the payment manager never iterates admin
//! rows itself.

use serde_json::Value;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy)]
pub enum NotifyTarget {
    User(Uuid),
    Admins,
}

pub fn title_for(kind: &str) -> &'static str {
    match kind {
        "booking_created" => "New Booking Created",
        "payment_created" => "New Payment Created",
        "payment_completed" => "Payment Completed",
        "payment_failed" => "Payment Failed",
        "booking_confirmed" => "Booking Confirmed",
        "booking_cancelled" => "Booking Cancelled",
        "event_created" => "Event Created",
        "system" => "System Notification",
        _ => "Notification",
    }
}

pub async fn notify<'e, E>(
    executor: E,
    target: NotifyTarget,
    kind: &str,
    message: &str,
    metadata: Option<Value>,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    let title = title_for(kind);

    match target {
        NotifyTarget::User(user_id) => {
            sqlx::query(
                "INSERT INTO notifications (user_id, type, title, message, metadata) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(user_id)
            .bind(kind)
            .bind(title)
            .bind(message)
            .bind(metadata)
            .execute(executor)
            .await?;
        }
        NotifyTarget::Admins => {
            sqlx::query(
                "INSERT INTO notifications (user_id, type, title, message, metadata) \
                 SELECT id, $1, $2, $3, $4 FROM users \
                 WHERE role = 'admin' AND status = 'active'",
            )
            .bind(kind)
            .bind(title)
            .bind(message)
            .bind(metadata)
            .execute(executor)
            .await?;
        }
    }

    Ok(())
}

/// Best-effort variant used after a transaction has already committed:
/// a failed notification must not turn a successful operation into an
/// error response.
pub async fn notify_or_log<'e, E>(
    executor: E,
    target: NotifyTarget,
    kind: &str,
    message: &str,
    metadata: Option<Value>,
) where
    E: PgExecutor<'e>,
{
    if let Err(e) = notify(executor, target, kind, message, metadata).await {
        tracing::warn!(error = ?e, kind, "Failed to record notification");
    }
}

/// Appends an audit trail entry.
pub async fn record_audit<'e, E>(
    executor: E,
    actor: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<String>,
    user_agent: Option<&str>,
    data: Option<Value>,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO audit_logs (user_id, action, resource_type, resource_id, user_agent, data) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(actor)
    .bind(action)
    .bind(resource_type)
    .bind(resource_id)
    .bind(user_agent)
    .bind(data)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_map_to_titles() {
        assert_eq!(title_for("payment_completed"), "Payment Completed");
        assert_eq!(title_for("booking_cancelled"), "Booking Cancelled");
        assert_eq!(title_for("something_else"), "Notification");
    }
}
