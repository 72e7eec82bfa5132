//! Booking creation and the admin status transition, including the bridge
//! into ticketing: confirming a paid booking publishes an Event sized to
//! the booking (idempotent by the event's natural key).

use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Booking, BookingPaymentStatus, BookingStatus, Event, EventStatus, EventType,
};
use crate::models::service::Service;
use crate::pricing;
use crate::services::notify::{self, NotifyTarget};
use crate::utils::error::AppError;

pub struct NewBooking {
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_id: Option<Uuid>,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub guest_count: i32,
    pub duration_hours: Option<i32>,
    pub message: Option<String>,
}

/// Creates a booking with a server-side price computed through the pricing
/// resolver; the client never supplies the amount.
pub async fn create_booking(pool: &PgPool, input: NewBooking) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let service_snapshot = match input.service_id {
        Some(service_id) => {
            let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
                .bind(service_id)
                .fetch_optional(&mut *tx)
                .await?
                .filter(Service::is_active)
                .ok_or_else(|| {
                    AppError::NotFound("Service not found or inactive".to_string())
                })?;
            Some(json!({
                "id": service.id,
                "name": service.name,
                "price": service.price,
                "category": service.category,
            }))
        }
        None => None,
    };

    let quote = pricing::quote_for(
        &mut *tx,
        input.event_type,
        input.guest_count,
        input.duration_hours,
    )
    .await?;

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (user_id, customer_name, customer_email, customer_phone, \
         service_id, service_snapshot, event_type, event_date, event_time, guest_count, \
         duration_hours, message, price_calculated, status, payment_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING *",
    )
    .bind(input.user_id)
    .bind(&input.customer_name)
    .bind(&input.customer_email)
    .bind(&input.customer_phone)
    .bind(input.service_id)
    .bind(&service_snapshot)
    .bind(input.event_type.as_str())
    .bind(input.event_date)
    .bind(input.event_time)
    .bind(input.guest_count)
    .bind(quote.duration_hours)
    .bind(&input.message)
    .bind(quote.total_price)
    .bind(BookingStatus::Pending.as_str())
    .bind(BookingPaymentStatus::Unpaid.as_str())
    .fetch_one(&mut *tx)
    .await?;

    notify::record_audit(
        &mut *tx,
        input.user_id,
        "create_booking",
        "booking",
        Some(booking.id.to_string()),
        None,
        Some(json!({
            "customerEmail": booking.customer_email,
            "eventType": booking.event_type,
            "priceCalculated": booking.price_calculated,
        })),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(booking_id = %booking.id, total = booking.price_calculated, "Booking created");

    notify::notify_or_log(
        pool,
        NotifyTarget::Admins,
        "booking_created",
        &format!("New booking created by {}", booking.customer_name),
        Some(json!({ "bookingId": booking.id, "customerEmail": booking.customer_email })),
    )
    .await;

    if let Some(user_id) = input.user_id {
        notify::notify_or_log(
            pool,
            NotifyTarget::User(user_id),
            "booking_created",
            &format!(
                "Your {} booking has been created successfully. Booking ID: {}",
                booking.event_type, booking.id
            ),
            Some(json!({ "bookingId": booking.id, "eventType": booking.event_type })),
        )
        .await;
    }

    Ok(booking)
}

/// Natural key title of the event a paid booking publishes into.
pub fn derived_event_title(event_type: &str, customer_name: &str) -> String {
    format!("{event_type} - {customer_name}")
}

pub struct StatusUpdate {
    pub booking: Booking,
    pub created_event: Option<Event>,
}

/// Admin transition of a booking's status. Confirming a booking whose
/// payment is already `paid` publishes an Event sized to the booking,
/// unless one with the same title/date/time already exists.
pub async fn update_status(
    pool: &PgPool,
    booking_id: Uuid,
    new_status: BookingStatus,
    actor: Uuid,
) -> Result<StatusUpdate, AppError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let old_status = booking.status.clone();

    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(new_status.as_str())
    .bind(booking_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut created_event = None;
    if new_status == BookingStatus::Confirmed
        && BookingPaymentStatus::parse(&booking.payment_status) == Some(BookingPaymentStatus::Paid)
    {
        let title = derived_event_title(&booking.event_type, &booking.customer_name);

        let existing = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE title = $1 AND event_date = $2 AND event_time = $3",
        )
        .bind(&title)
        .bind(booking.event_date)
        .bind(booking.event_time)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_none() {
            let description = booking.message.clone().unwrap_or_else(|| {
                format!(
                    "Event created from booking for {}. Contact: {}",
                    booking.customer_name, booking.customer_phone
                )
            });
            let ticket_price =
                pricing::per_guest_price(booking.price_calculated, booking.guest_count);

            let event = sqlx::query_as::<_, Event>(
                "INSERT INTO events (title, description, event_type, location, event_date, \
                 event_time, ticket_price, total_tickets, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
            )
            .bind(&title)
            .bind(&description)
            .bind(&booking.event_type)
            .bind("To be determined")
            .bind(booking.event_date)
            .bind(booking.event_time)
            .bind(ticket_price)
            .bind(booking.guest_count)
            .bind(EventStatus::Published.as_str())
            .fetch_one(&mut *tx)
            .await?;

            tracing::info!(booking_id = %booking.id, event_id = %event.id, "Event created from confirmed booking");
            created_event = Some(event);
        }
    }

    notify::record_audit(
        &mut *tx,
        Some(actor),
        "update_booking_status",
        "booking",
        Some(booking_id.to_string()),
        None,
        Some(json!({
            "oldStatus": old_status,
            "newStatus": new_status.as_str(),
            "createdEventId": created_event.as_ref().map(|e| e.id),
        })),
    )
    .await?;

    tx.commit().await?;

    if matches!(new_status, BookingStatus::Confirmed | BookingStatus::Cancelled) {
        if let Some(user_id) = booking.user_id {
            let suffix = if created_event.is_some() {
                " and published as an event"
            } else {
                ""
            };
            notify::notify_or_log(
                pool,
                NotifyTarget::User(user_id),
                &format!("booking_{}", new_status.as_str()),
                &format!("Your booking has been {}{}", new_status.as_str(), suffix),
                Some(json!({
                    "bookingId": booking_id,
                    "status": new_status.as_str(),
                    "eventId": created_event.as_ref().map(|e| e.id),
                })),
            )
            .await;
        }
    }

    if let Some(event) = &created_event {
        notify::notify_or_log(
            pool,
            NotifyTarget::Admins,
            "event_created",
            &format!(
                "Event automatically created from confirmed booking: {}",
                event.title
            ),
            Some(json!({ "eventId": event.id, "bookingId": booking_id })),
        )
        .await;
    }

    Ok(StatusUpdate {
        booking,
        created_event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_key_title_combines_type_and_customer() {
        assert_eq!(
            derived_event_title("wedding", "Hirut Bekele"),
            "wedding - Hirut Bekele"
        );
    }

    #[test]
    fn per_ticket_price_divides_total_by_guests() {
        // 20000 ETB across 120 guests, rounded to the nearest birr.
        assert_eq!(pricing::per_guest_price(20_000, 120), 167);
    }
}
