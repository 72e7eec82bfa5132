use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::inventory;
use crate::models::{Event, EventStatus, EventType, PaymentMethod};
use crate::services::notify;
use crate::services::payment as payment_service;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success, Page};

use super::bookings::ProceedPaymentRequest;

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// `GET /api/events` — public callers see published events only, each with
/// its derived remaining capacity.
pub async fn list_events(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Query(query): Query<EventListQuery>,
) -> Result<Response, AppError> {
    let (page, limit, offset) = super::Pagination {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    // Non-admins are pinned to published regardless of the filter.
    let status = if auth.is_admin() {
        query.status.clone()
    } else {
        Some(EventStatus::Published.as_str().to_string())
    };

    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR event_type = $2) \
         ORDER BY event_date ASC, event_time ASC LIMIT $3 OFFSET $4",
    )
    .bind(&status)
    .bind(&query.event_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM events \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR event_type = $2)",
    )
    .bind(&status)
    .bind(&query.event_type)
    .fetch_one(&state.pool)
    .await?;

    let events = inventory::with_remaining(&state.pool, events).await?;

    Ok(success(Page::new(events, total, page, limit), "Events loaded").into_response())
}

/// `GET /api/events/:id` — drafts are invisible to non-admins.
pub async fn get_event(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if !auth.is_admin() && !event.is_published() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    let remaining_tickets = inventory::remaining_for(&state.pool, &event).await?;

    Ok(success(
        crate::models::event::EventWithRemaining {
            event,
            remaining_tickets,
        },
        "Event loaded",
    )
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub location: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub ticket_price: i64,
    pub total_tickets: Option<i32>,
    pub status: Option<String>,
}

fn validate_event_fields(
    title: &str,
    event_type: &str,
    ticket_price: i64,
    total_tickets: Option<i32>,
    status: Option<&str>,
) -> Result<(), AppError> {
    if title.trim().len() < 2 {
        return Err(AppError::ValidationError(
            "title must be at least 2 characters".to_string(),
        ));
    }
    EventType::parse(event_type)
        .ok_or_else(|| AppError::ValidationError(format!("Unknown event type '{event_type}'")))?;
    if ticket_price < 0 {
        return Err(AppError::ValidationError(
            "ticketPrice must not be negative".to_string(),
        ));
    }
    if let Some(total) = total_tickets {
        if total < 0 {
            return Err(AppError::ValidationError(
                "totalTickets must not be negative".to_string(),
            ));
        }
    }
    if let Some(s) = status {
        EventStatus::parse(s)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown event status '{s}'")))?;
    }
    Ok(())
}

/// `POST /api/events` — admin catalog upkeep.
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;
    validate_event_fields(
        &req.title,
        &req.event_type,
        req.ticket_price,
        req.total_tickets,
        req.status.as_deref(),
    )?;
    let event_time = super::bookings::parse_event_time(&req.event_time)?;
    let status = req.status.as_deref().unwrap_or("draft");

    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events (title, description, event_type, location, event_date, event_time, \
         ticket_price, total_tickets, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&req.event_type)
    .bind(&req.location)
    .bind(req.event_date)
    .bind(event_time)
    .bind(req.ticket_price)
    .bind(req.total_tickets)
    .bind(status)
    .fetch_one(&state.pool)
    .await?;

    notify::record_audit(
        &state.pool,
        Some(auth.id),
        "create_event",
        "event",
        Some(event.id.to_string()),
        None,
        Some(json!({ "title": event.title, "eventType": event.event_type })),
    )
    .await?;

    Ok(created(event, "Event created successfully").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<String>,
    pub ticket_price: Option<i64>,
    pub total_tickets: Option<i32>,
    pub status: Option<String>,
}

/// `PUT /api/events/:id` — partial update, admin only.
pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    if let Some(price) = req.ticket_price {
        if price < 0 {
            return Err(AppError::ValidationError(
                "ticketPrice must not be negative".to_string(),
            ));
        }
    }
    if let Some(s) = req.status.as_deref() {
        EventStatus::parse(s)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown event status '{s}'")))?;
    }
    let event_time = req
        .event_time
        .as_deref()
        .map(super::bookings::parse_event_time)
        .transpose()?;

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events SET \
         title = COALESCE($1, title), \
         description = COALESCE($2, description), \
         location = COALESCE($3, location), \
         event_date = COALESCE($4, event_date), \
         event_time = COALESCE($5, event_time), \
         ticket_price = COALESCE($6, ticket_price), \
         total_tickets = COALESCE($7, total_tickets), \
         status = COALESCE($8, status), \
         updated_at = now() \
         WHERE id = $9 RETURNING *",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.location)
    .bind(req.event_date)
    .bind(event_time)
    .bind(req.ticket_price)
    .bind(req.total_tickets)
    .bind(&req.status)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    notify::record_audit(
        &state.pool,
        Some(auth.id),
        "update_event",
        "event",
        Some(id.to_string()),
        None,
        None,
    )
    .await?;

    Ok(success(event, "Event updated successfully").into_response())
}

/// Tickets can only be bought for published events. Reported as a 400 to
/// the client, like any other bad purchase request.
fn ensure_purchasable(event: &Event) -> Result<(), AppError> {
    if event.is_published() {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "Event not available for purchase".to_string(),
        ))
    }
}

/// `POST /api/events/:id/proceed-payment` — advisory sold-out pre-check;
/// the authoritative capacity check runs at approval time.
pub async fn proceed_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ProceedPaymentRequest>,
) -> Result<Response, AppError> {
    let method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| AppError::ValidationError("Unknown payment method".to_string()))?;

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    ensure_purchasable(&event)?;

    if let Some(remaining) = inventory::remaining_for(&state.pool, &event).await? {
        if remaining == 0 {
            return Err(AppError::SoldOut);
        }
    }

    let payment = payment_service::create_event_payment(
        &state.pool,
        id,
        Some(auth.id),
        method,
        req.phone_number.clone(),
    )
    .await?;

    let instructions =
        payment_service::payment_instructions(method, payment.amount, req.phone_number.as_deref());
    let receiver = payment_service::load_receiver(&state.pool, method).await?;

    Ok(success(
        payment_service::InitiatedPayment {
            payment,
            instructions,
            receiver,
        },
        "Payment initiated successfully",
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event_with_status(status: &str) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Meskel Eve Concert".to_string(),
            description: None,
            event_type: "other".to_string(),
            location: Some("Meskel Square".to_string()),
            event_date: "2026-09-26".parse().unwrap(),
            event_time: chrono::NaiveTime::parse_from_str("18:00", "%H:%M").unwrap(),
            ticket_price: 500,
            total_tickets: Some(200),
            status: status.to_string(),
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn published_event_is_purchasable() {
        assert!(ensure_purchasable(&event_with_status("published")).is_ok());
    }

    #[test]
    fn draft_event_rejects_purchase_with_bad_request() {
        let err = ensure_purchasable(&event_with_status("draft")).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(
            err.status_code(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn cancelled_event_rejects_purchase() {
        assert!(ensure_purchasable(&event_with_status("cancelled")).is_err());
    }
}
