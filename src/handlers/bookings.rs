use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::models::{Booking, BookingStatus, EventType, Payment, PaymentMethod, PaymentState};
use crate::pricing;
use crate::services::booking::{self, NewBooking};
use crate::services::payment as payment_service;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success, Page};

const MAX_GUESTS: i32 = 1000;

fn parse_event_type(s: &str) -> Result<EventType, AppError> {
    EventType::parse(s)
        .ok_or_else(|| AppError::ValidationError(format!("Unknown event type '{s}'")))
}

pub(crate) fn parse_event_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::ValidationError("eventTime must be HH:MM".to_string()))
}

fn validate_guests_and_hours(guest_count: i32, duration_hours: Option<i32>) -> Result<(), AppError> {
    if !(1..=MAX_GUESTS).contains(&guest_count) {
        return Err(AppError::ValidationError(format!(
            "guestCount must be between 1 and {MAX_GUESTS}"
        )));
    }
    if let Some(hours) = duration_hours {
        if hours < 1 {
            return Err(AppError::ValidationError(
                "durationHours must be at least 1".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcPriceRequest {
    pub event_type: String,
    pub guest_count: i32,
    pub duration_hours: Option<i32>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<String>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    #[serde(flatten)]
    quote: pricing::Quote,
    service: Option<serde_json::Value>,
}

/// `POST /api/bookings/calc-price` — idempotent quote, no side effects.
pub async fn calc_price(
    State(state): State<AppState>,
    Json(req): Json<CalcPriceRequest>,
) -> Result<Response, AppError> {
    let event_type = parse_event_type(&req.event_type)?;
    validate_guests_and_hours(req.guest_count, req.duration_hours)?;

    let service = match req.service_id {
        Some(service_id) => {
            let service = sqlx::query_as::<_, crate::models::service::Service>(
                "SELECT * FROM services WHERE id = $1",
            )
            .bind(service_id)
            .fetch_optional(&state.pool)
            .await?
            .filter(crate::models::service::Service::is_active)
            .ok_or_else(|| AppError::NotFound("Service not found or inactive".to_string()))?;
            Some(serde_json::json!({
                "id": service.id,
                "name": service.name,
                "price": service.price,
                "category": service.category,
            }))
        }
        None => None,
    };

    let quote = pricing::quote_for(
        &state.pool,
        event_type,
        req.guest_count,
        req.duration_hours,
    )
    .await?;

    Ok(success(QuoteResponse { quote, service }, "Price calculated").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub guest_count: i32,
    pub duration_hours: Option<i32>,
    pub service_id: Option<Uuid>,
    pub message: Option<String>,
}

/// `POST /api/bookings` — price is recomputed server-side, never trusted
/// from the client.
pub async fn create_booking(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Response, AppError> {
    let event_type = parse_event_type(&req.event_type)?;
    validate_guests_and_hours(req.guest_count, req.duration_hours)?;
    let event_time = parse_event_time(&req.event_time)?;

    if req.customer_name.trim().len() < 2 {
        return Err(AppError::ValidationError(
            "customerName must be at least 2 characters".to_string(),
        ));
    }
    if !req.customer_email.contains('@') {
        return Err(AppError::ValidationError(
            "customerEmail must be a valid email address".to_string(),
        ));
    }

    let booking = booking::create_booking(
        &state.pool,
        NewBooking {
            user_id: auth.user_id(),
            customer_name: req.customer_name.trim().to_string(),
            customer_email: req.customer_email,
            customer_phone: req.customer_phone,
            service_id: req.service_id,
            event_type,
            event_date: req.event_date,
            event_time,
            guest_count: req.guest_count,
            duration_hours: req.duration_hours,
            message: req.message,
        },
    )
    .await?;

    Ok(created(booking, "Booking created successfully").into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingDetail {
    #[serde(flatten)]
    booking: Booking,
    payments: Vec<Payment>,
}

/// `GET /api/bookings/:id` — owner or admin.
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if !auth.is_admin() && booking.user_id != Some(auth.id) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(BookingDetail { booking, payments }, "Booking loaded").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

/// `GET /api/bookings` — admin listing with status filters.
pub async fn list_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> Result<Response, AppError> {
    auth.require_admin()?;
    let (page, limit, offset) = super::Pagination {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR payment_status = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(&query.status)
    .bind(&query.payment_status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR payment_status = $2)",
    )
    .bind(&query.status)
    .bind(&query.payment_status)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(Page::new(bookings, total, page, limit), "Bookings loaded").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProceedPaymentRequest {
    pub payment_method: String,
    pub phone_number: Option<String>,
}

/// `POST /api/bookings/:id/proceed-payment` — creates the pending payment
/// and returns it with the channel instructions and receiver details.
/// Requires a token; non-admins may only pay their own bookings.
pub async fn proceed_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ProceedPaymentRequest>,
) -> Result<Response, AppError> {
    let method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| AppError::ValidationError("Unknown payment method".to_string()))?;

    let payment = payment_service::create_booking_payment(
        &state.pool,
        &auth,
        id,
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

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdateResponse {
    booking: Booking,
    created_event: Option<crate::models::Event>,
}

/// `PUT /api/bookings/:id/status` — admin transition; may publish an Event
/// when confirming a paid booking.
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let new_status = BookingStatus::parse(&req.status)
        .ok_or_else(|| AppError::ValidationError("Invalid status".to_string()))?;

    let outcome = booking::update_status(&state.pool, id, new_status, auth.id).await?;

    Ok(success(
        StatusUpdateResponse {
            booking: outcome.booking,
            created_event: outcome.created_event,
        },
        "Booking status updated successfully",
    )
    .into_response())
}

/// `GET /api/bookings/:id/qrcode` — serves the ticket artifact once the
/// payment completed and generation succeeded.
pub async fn get_qrcode(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if !auth.is_admin() && booking.user_id != Some(auth.id) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let completed = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payments WHERE booking_id = $1 AND status = $2",
    )
    .bind(id)
    .bind(PaymentState::Completed.as_str())
    .fetch_one(&state.pool)
    .await?;
    if completed == 0 {
        return Err(AppError::NotFound(
            "Booking not found or payment not completed".to_string(),
        ));
    }

    let qr_url = booking
        .qr_code_url
        .ok_or_else(|| AppError::NotFound("QR code not available".to_string()))?;

    let bytes = state.store.read(&qr_url).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        bytes,
    )
        .into_response())
}
