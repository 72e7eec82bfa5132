use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Manual payment channels. "abyssinia" is accepted as a spelling alias of
/// `abisiniya` on input and normalized before anything is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Telebirr,
    Cbe,
    Commercial,
    Abisiniya,
}

impl PaymentMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "telebirr" => Some(PaymentMethod::Telebirr),
            "cbe" => Some(PaymentMethod::Cbe),
            "commercial" => Some(PaymentMethod::Commercial),
            "abisiniya" | "abyssinia" => Some(PaymentMethod::Abisiniya),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Telebirr => "telebirr",
            PaymentMethod::Cbe => "cbe",
            PaymentMethod::Commercial => "commercial",
            PaymentMethod::Abisiniya => "abisiniya",
        }
    }
}

/// Lifecycle of a single payment attempt. `pending -> {completed | failed}`
/// via an admin decision; `refunded` only from `completed` through an
/// administrative action outside this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentState::Pending),
            "processing" => Some(PaymentState::Processing),
            "completed" => Some(PaymentState::Completed),
            "failed" => Some(PaymentState::Failed),
            "refunded" => Some(PaymentState::Refunded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Processing => "processing",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
        }
    }
}

/// What a payment pays for: exactly one of a booking, or a ticket purchase
/// on an event by a (possibly anonymous) user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Booking(Uuid),
    EventTicket {
        event_id: Uuid,
        user_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub phone_number: Option<String>,
    pub transaction_id: Option<String>,
    pub status: String,
    pub metadata: Option<Value>,
    pub proof_image_url: Option<String>,
    pub proof_uploaded_at: Option<DateTime<Utc>>,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// The single-target invariant is enforced by a database CHECK; a row
    /// violating it can only mean schema drift, surfaced as a server error.
    pub fn target(&self) -> Result<PaymentTarget, AppError> {
        match (self.booking_id, self.event_id) {
            (Some(booking_id), None) => Ok(PaymentTarget::Booking(booking_id)),
            (None, Some(event_id)) => Ok(PaymentTarget::EventTicket {
                event_id,
                user_id: self.user_id,
            }),
            _ => Err(AppError::InternalServerError(
                "Payment row violates the single-target invariant".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_normalizes_alias() {
        assert_eq!(
            PaymentMethod::parse("abyssinia"),
            Some(PaymentMethod::Abisiniya)
        );
        assert_eq!(
            PaymentMethod::parse("Abisiniya"),
            Some(PaymentMethod::Abisiniya)
        );
        assert_eq!(PaymentMethod::parse("paypal"), None);
    }

    #[test]
    fn alias_never_survives_normalization() {
        // Whatever the client sent, what we persist is the canonical name.
        let method = PaymentMethod::parse("abyssinia").unwrap();
        assert_eq!(method.as_str(), "abisiniya");
    }

    fn base_payment() -> Payment {
        Payment {
            id: Uuid::new_v4(),
            booking_id: None,
            event_id: None,
            user_id: None,
            amount: 1000,
            currency: "ETB".to_string(),
            payment_method: "telebirr".to_string(),
            phone_number: None,
            transaction_id: Some("AB12CD34EF56AB78".to_string()),
            status: "pending".to_string(),
            metadata: None,
            proof_image_url: None,
            proof_uploaded_at: None,
            qr_code_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn target_is_exactly_one_of_booking_or_event() {
        let booking_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();

        let mut p = base_payment();
        p.booking_id = Some(booking_id);
        assert_eq!(p.target().unwrap(), PaymentTarget::Booking(booking_id));

        let mut p = base_payment();
        p.event_id = Some(event_id);
        p.user_id = Some(Uuid::new_v4());
        assert!(matches!(
            p.target().unwrap(),
            PaymentTarget::EventTicket { event_id: e, .. } if e == event_id
        ));

        let p = base_payment();
        assert!(p.target().is_err());
    }
}
