//! Payment Lifecycle Manager.
//!
//! A payment is created `pending` against exactly one target (booking or
//! event ticket), collects a proof image as evidence, and is resolved by an
//! admin decision: approve completes it and issues a ticket artifact,
//! reject fails it. Every multi-row mutation commits atomically; an error
//! anywhere rolls the whole unit back.

use serde::Serialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::inventory;
use crate::models::{
    Booking, BookingPaymentStatus, BookingStatus, Event, Payment, PaymentMethod,
    PaymentMethodConfig, PaymentState, PaymentTarget,
};
use crate::services::{notify, ticket};
use crate::utils::error::AppError;
use crate::utils::storage::FileStore;
use crate::utils::token;

/// Everything the client needs to start paying: the pending payment, the
/// per-channel step list, and the configured receiving party.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub instructions: Instructions,
    pub receiver: Option<PaymentMethodConfig>,
}

#[derive(Debug, Serialize)]
pub struct Instructions {
    pub title: String,
    pub steps: Vec<String>,
    pub note: String,
}

// -- pure transition guards ------------------------------------------------

/// A booking accepts a new payment only while unpaid. `processing` means a
/// non-terminal payment already exists; `paid` is terminal.
fn ensure_accepts_payment(booking: &Booking) -> Result<(), AppError> {
    match BookingPaymentStatus::parse(&booking.payment_status) {
        Some(BookingPaymentStatus::Unpaid) => Ok(()),
        Some(BookingPaymentStatus::Paid) => {
            Err(AppError::InvalidState("Booking already paid".to_string()))
        }
        _ => Err(AppError::InvalidState(
            "A payment is already in progress for this booking".to_string(),
        )),
    }
}

/// An admin decision requires a still-pending payment with proof on file.
fn ensure_decidable(payment: &Payment) -> Result<(), AppError> {
    if PaymentState::parse(&payment.status) != Some(PaymentState::Pending) {
        return Err(AppError::InvalidState(
            "Payment already processed".to_string(),
        ));
    }
    if payment.proof_image_url.is_none() {
        return Err(AppError::ProofMissing);
    }
    Ok(())
}

/// Last-checkpoint capacity guard: `completed_excluding_self` completed
/// payments already hold tickets; approving one more must still fit.
fn check_capacity(total_tickets: Option<i32>, completed_excluding_self: i64) -> Result<(), AppError> {
    match total_tickets {
        None => Ok(()),
        Some(total) if completed_excluding_self < i64::from(total) => Ok(()),
        Some(_) => Err(AppError::SoldOut),
    }
}

/// Only the booking owner or an admin may start a payment for it. Bookings
/// without a linked account can be paid by any signed-in caller.
fn ensure_initiator(caller: &AuthUser, booking: &Booking) -> Result<(), AppError> {
    match booking.user_id {
        Some(owner) if !caller.is_admin() && owner != caller.id => {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
        _ => Ok(()),
    }
}

// -- creation --------------------------------------------------------------

/// Creates a pending payment for a booking and flips the booking to
/// `processing`, atomically.
pub async fn create_booking_payment(
    pool: &PgPool,
    caller: &AuthUser,
    booking_id: Uuid,
    method: PaymentMethod,
    phone_number: Option<String>,
) -> Result<Payment, AppError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    ensure_initiator(caller, &booking)?;
    ensure_accepts_payment(&booking)?;

    let payment = sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (booking_id, amount, currency, payment_method, phone_number, transaction_id, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(booking_id)
    .bind(booking.price_calculated)
    .bind(crate::pricing::CURRENCY)
    .bind(method.as_str())
    .bind(&phone_number)
    .bind(token::transaction_id())
    .bind(PaymentState::Pending.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE bookings SET payment_status = $1, updated_at = now() WHERE id = $2")
        .bind(BookingPaymentStatus::Processing.as_str())
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(payment_id = %payment.id, booking_id = %booking_id, "Payment created");

    notify::notify_or_log(
        pool,
        notify::NotifyTarget::Admins,
        "payment_created",
        &format!("New payment created for booking {booking_id}"),
        Some(json!({
            "bookingId": booking_id,
            "paymentId": payment.id,
            "amount": payment.amount,
        })),
    )
    .await;

    Ok(payment)
}

/// Creates a pending ticket payment against an event. Capacity is not
/// checked here; the authoritative check runs at approval time.
pub async fn create_event_payment(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Option<Uuid>,
    method: PaymentMethod,
    phone_number: Option<String>,
) -> Result<Payment, AppError> {
    let mut tx = pool.begin().await?;

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let payment = sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (event_id, user_id, amount, currency, payment_method, phone_number, transaction_id, status, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(event_id)
    .bind(user_id)
    .bind(event.ticket_price)
    .bind(crate::pricing::CURRENCY)
    .bind(method.as_str())
    .bind(&phone_number)
    .bind(token::transaction_id())
    .bind(PaymentState::Pending.as_str())
    .bind(json!({ "type": "event", "title": event.title }))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(payment_id = %payment.id, event_id = %event_id, "Event ticket payment created");

    notify::notify_or_log(
        pool,
        notify::NotifyTarget::Admins,
        "payment_created",
        &format!("New payment created for event {event_id}"),
        Some(json!({
            "eventId": event_id,
            "paymentId": payment.id,
            "amount": payment.amount,
        })),
    )
    .await;

    Ok(payment)
}

// -- proof upload ----------------------------------------------------------

/// Attaches an uploaded proof image to a payment. Evidence only: the
/// status does not change until an admin decides.
pub async fn upload_proof(
    pool: &PgPool,
    payment_id: Uuid,
    caller: &AuthUser,
    proof_url: String,
) -> Result<Payment, AppError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if !caller.is_admin() {
        let owner_id = payment_owner(pool, &payment).await?;
        if owner_id != Some(caller.id) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
    }

    let updated = sqlx::query_as::<_, Payment>(
        "UPDATE payments SET proof_image_url = $1, proof_uploaded_at = now(), updated_at = now() \
         WHERE id = $2 RETURNING *",
    )
    .bind(&proof_url)
    .bind(payment_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(payment_id = %payment_id, "Payment proof uploaded");

    Ok(updated)
}

/// Resolves the owning user of a payment: the booking's user for booking
/// payments, the purchasing user for event payments.
pub async fn payment_owner(pool: &PgPool, payment: &Payment) -> Result<Option<Uuid>, AppError> {
    match payment.target()? {
        PaymentTarget::Booking(booking_id) => {
            let owner = sqlx::query_scalar::<_, Option<Uuid>>(
                "SELECT user_id FROM bookings WHERE id = $1",
            )
            .bind(booking_id)
            .fetch_optional(pool)
            .await?;
            Ok(owner.flatten())
        }
        PaymentTarget::EventTicket { user_id, .. } => Ok(user_id),
    }
}

// -- admin decision --------------------------------------------------------

/// Applies an admin decision to a pending payment.
///
/// Approve: flips the payment to `completed` (and, for bookings, the
/// booking to `paid`/`confirmed`), issues the ticket artifact and commits
/// everything atomically. For finite-capacity events the completed count
/// is re-checked here, with the event row locked for the duration.
/// Reject: flips the payment to `failed` (booking to `failed`).
pub async fn process_payment(
    pool: &PgPool,
    store: &FileStore,
    payment_id: Uuid,
    approve: bool,
) -> Result<Payment, AppError> {
    let mut tx = pool.begin().await?;

    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    ensure_decidable(&payment)?;

    let target = payment.target()?;

    let booking = match target {
        PaymentTarget::Booking(booking_id) => Some(
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?,
        ),
        PaymentTarget::EventTicket { .. } => None,
    };

    let updated = if approve {
        approve_in_tx(&mut tx, store, &payment, booking.as_ref(), target).await?
    } else {
        reject_in_tx(&mut tx, &payment, booking.as_ref()).await?
    };

    tx.commit().await?;

    let owner = match &booking {
        Some(b) => b.user_id,
        None => payment.user_id,
    };

    if let Some(owner_id) = owner {
        let (kind, message) = if approve {
            ("payment_completed", "Payment completed successfully")
        } else {
            ("payment_failed", "Payment failed. Please try again.")
        };
        notify::notify_or_log(
            pool,
            notify::NotifyTarget::User(owner_id),
            kind,
            message,
            Some(json!({
                "paymentId": payment.id,
                "bookingId": payment.booking_id,
                "eventId": payment.event_id,
            })),
        )
        .await;
    }

    tracing::info!(payment_id = %payment_id, approve, status = %updated.status, "Payment processed");

    Ok(updated)
}

async fn approve_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    store: &FileStore,
    payment: &Payment,
    booking: Option<&Booking>,
    target: PaymentTarget,
) -> Result<Payment, AppError> {
    if let PaymentTarget::EventTicket { event_id, .. } = target {
        // Lock the event row so concurrent approvals of the last ticket
        // serialize on the capacity re-check.
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if event.total_tickets.is_some() {
            let completed = inventory::sold_count_excluding(&mut **tx, event_id, payment.id).await?;
            check_capacity(event.total_tickets, completed)?;
        }
    }

    // Artifact generation must not sink the approval; a missing QR code is
    // surfaced later through the dedicated fetch route.
    let qr_code_url = match ticket::issue_ticket(store, payment).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(payment_id = %payment.id, error = %e, "Ticket artifact generation failed");
            None
        }
    };

    let updated = sqlx::query_as::<_, Payment>(
        "UPDATE payments SET status = $1, qr_code_url = $2, updated_at = now() \
         WHERE id = $3 RETURNING *",
    )
    .bind(PaymentState::Completed.as_str())
    .bind(&qr_code_url)
    .bind(payment.id)
    .fetch_one(&mut **tx)
    .await?;

    if let Some(booking) = booking {
        sqlx::query(
            "UPDATE bookings SET payment_status = $1, status = $2, qr_code_url = $3, \
             transaction_id = $4, updated_at = now() WHERE id = $5",
        )
        .bind(BookingPaymentStatus::Paid.as_str())
        .bind(BookingStatus::Confirmed.as_str())
        .bind(&qr_code_url)
        .bind(&payment.transaction_id)
        .bind(booking.id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(updated)
}

async fn reject_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
    booking: Option<&Booking>,
) -> Result<Payment, AppError> {
    let updated = sqlx::query_as::<_, Payment>(
        "UPDATE payments SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(PaymentState::Failed.as_str())
    .bind(payment.id)
    .fetch_one(&mut **tx)
    .await?;

    if let Some(booking) = booking {
        sqlx::query("UPDATE bookings SET payment_status = $1, updated_at = now() WHERE id = $2")
            .bind(BookingPaymentStatus::Failed.as_str())
            .bind(booking.id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(updated)
}

// -- instructions ----------------------------------------------------------

/// Static per-channel payment instructions. Purely presentational.
pub fn payment_instructions(
    method: PaymentMethod,
    amount: i64,
    phone_number: Option<&str>,
) -> Instructions {
    let amount_line = format!("Enter amount: {amount} ETB");
    let phone_line = match phone_number {
        Some(phone) => format!("Enter phone number: {phone}"),
        None => "Enter recipient number".to_string(),
    };

    match method {
        PaymentMethod::Telebirr => Instructions {
            title: "Telebirr Payment Instructions".to_string(),
            steps: vec![
                "Open your Telebirr app".to_string(),
                "Go to \"Send Money\"".to_string(),
                amount_line,
                phone_line,
                "Add note: \"Event Booking Payment\"".to_string(),
                "Confirm and complete payment".to_string(),
            ],
            note: "Payment will be verified within 2-3 minutes.".to_string(),
        },
        PaymentMethod::Cbe => Instructions {
            title: "CBE Birr Payment Instructions".to_string(),
            steps: vec![
                "Dial *847# on your phone".to_string(),
                "Select \"Send Money\"".to_string(),
                amount_line,
                phone_line,
                "Confirm transaction with your PIN".to_string(),
            ],
            note: "Keep the transaction reference for verification.".to_string(),
        },
        PaymentMethod::Abisiniya => Instructions {
            title: "Abyssinia Bank Payment Instructions".to_string(),
            steps: vec![
                "Visit Abyssinia Bank branch or use internet banking".to_string(),
                "Make deposit to account: 1234567890".to_string(),
                format!("Amount: {amount} ETB"),
                "Use your phone number as reference".to_string(),
            ],
            note: "Email the deposit slip to payments@eventbooking.com".to_string(),
        },
        PaymentMethod::Commercial => Instructions {
            title: "Commercial Bank Payment Instructions".to_string(),
            steps: vec![
                "Visit Commercial Bank branch or use internet banking".to_string(),
                "Make deposit to account: 0987654321".to_string(),
                format!("Amount: {amount} ETB"),
                "Use your phone number as reference".to_string(),
            ],
            note: "Email the deposit slip to payments@eventbooking.com".to_string(),
        },
    }
}

/// Loads the configured receiving party for a channel, if any.
pub async fn load_receiver(
    pool: &PgPool,
    method: PaymentMethod,
) -> Result<Option<PaymentMethodConfig>, AppError> {
    let receiver = sqlx::query_as::<_, PaymentMethodConfig>(
        "SELECT * FROM payment_method_configs WHERE method = $1",
    )
    .bind(method.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn booking_with_payment_status(payment_status: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            customer_name: "Hirut Bekele".to_string(),
            customer_email: "hirut@example.com".to_string(),
            customer_phone: "0911000000".to_string(),
            service_id: None,
            service_snapshot: None,
            event_type: "wedding".to_string(),
            event_date: "2026-10-12".parse().unwrap(),
            event_time: chrono::NaiveTime::parse_from_str("14:30", "%H:%M").unwrap(),
            guest_count: 120,
            duration_hours: 5,
            message: None,
            price_calculated: 20_000,
            status: "pending".to_string(),
            payment_status: payment_status.to_string(),
            qr_code_url: None,
            transaction_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn pending_payment(proof: Option<&str>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            booking_id: Some(Uuid::new_v4()),
            event_id: None,
            user_id: None,
            amount: 20_000,
            currency: "ETB".to_string(),
            payment_method: "telebirr".to_string(),
            phone_number: Some("0911000000".to_string()),
            transaction_id: Some("AB12CD34EF56AB78".to_string()),
            status: "pending".to_string(),
            metadata: None,
            proof_image_url: proof.map(str::to_string),
            proof_uploaded_at: None,
            qr_code_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn customer(id: Uuid) -> AuthUser {
        AuthUser {
            id,
            role: crate::auth::ROLE_CUSTOMER.to_string(),
        }
    }

    #[test]
    fn owner_may_initiate_payment() {
        let booking = booking_with_payment_status("unpaid");
        let owner = customer(booking.user_id.unwrap());
        assert!(ensure_initiator(&owner, &booking).is_ok());
    }

    #[test]
    fn stranger_may_not_initiate_payment_on_owned_booking() {
        let booking = booking_with_payment_status("unpaid");
        let err = ensure_initiator(&customer(Uuid::new_v4()), &booking).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn admin_may_initiate_payment_on_any_booking() {
        let booking = booking_with_payment_status("unpaid");
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: crate::auth::ROLE_ADMIN.to_string(),
        };
        assert!(ensure_initiator(&admin, &booking).is_ok());
    }

    #[test]
    fn guest_booking_accepts_any_signed_in_initiator() {
        let mut booking = booking_with_payment_status("unpaid");
        booking.user_id = None;
        assert!(ensure_initiator(&customer(Uuid::new_v4()), &booking).is_ok());
    }

    #[test]
    fn unpaid_booking_accepts_a_payment() {
        assert!(ensure_accepts_payment(&booking_with_payment_status("unpaid")).is_ok());
    }

    #[test]
    fn paid_booking_rejects_further_payments() {
        let err = ensure_accepts_payment(&booking_with_payment_status("paid")).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn in_flight_payment_blocks_a_second_one() {
        let err = ensure_accepts_payment(&booking_with_payment_status("processing")).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn decision_requires_proof() {
        let err = ensure_decidable(&pending_payment(None)).unwrap_err();
        assert!(matches!(err, AppError::ProofMissing));
        assert!(ensure_decidable(&pending_payment(Some("/uploads/payments/x.png"))).is_ok());
    }

    #[test]
    fn second_decision_is_rejected() {
        let mut payment = pending_payment(Some("/uploads/payments/x.png"));
        payment.status = "completed".to_string();
        let err = ensure_decidable(&payment).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        payment.status = "failed".to_string();
        assert!(ensure_decidable(&payment).is_err());
    }

    #[test]
    fn capacity_guard_allows_the_last_ticket() {
        assert!(check_capacity(Some(1), 0).is_ok());
        assert!(check_capacity(None, 1_000_000).is_ok());
    }

    #[test]
    fn capacity_guard_refuses_when_full() {
        let err = check_capacity(Some(1), 1).unwrap_err();
        assert!(matches!(err, AppError::SoldOut));
        assert!(check_capacity(Some(10), 11).is_err());
    }

    #[test]
    fn instructions_cover_every_channel() {
        for method in [
            PaymentMethod::Telebirr,
            PaymentMethod::Cbe,
            PaymentMethod::Commercial,
            PaymentMethod::Abisiniya,
        ] {
            let instructions = payment_instructions(method, 26_500, Some("0911223344"));
            assert!(!instructions.steps.is_empty());
            assert!(instructions
                .steps
                .iter()
                .any(|s| s.contains("26500 ETB")));
        }
    }

    #[test]
    fn instructions_fall_back_without_a_phone() {
        let instructions = payment_instructions(PaymentMethod::Telebirr, 100, None);
        assert!(instructions
            .steps
            .iter()
            .any(|s| s == "Enter recipient number"));
    }
}
