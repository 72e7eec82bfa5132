use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::Notification;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{success, Page};

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /api/notifications` — the caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<Response, AppError> {
    let (page, limit, offset) = super::Pagination {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(auth.id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(auth.id)
            .fetch_one(&state.pool)
            .await?;

    Ok(success(Page::new(notifications, total, page, limit), "Notifications loaded")
        .into_response())
}

/// `PUT /api/notifications/:id/read` — scoped to the owning user.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(auth.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    Ok(success(notification, "Notification marked as read").into_response())
}
