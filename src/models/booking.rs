use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Event categories shared by bookings, events and pricing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Wedding,
    Birthday,
    Corporate,
    Other,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Wedding,
        EventType::Birthday,
        EventType::Corporate,
        EventType::Other,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wedding" => Some(EventType::Wedding),
            "birthday" => Some(EventType::Birthday),
            "corporate" => Some(EventType::Corporate),
            "other" => Some(EventType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Wedding => "wedding",
            EventType::Birthday => "birthday",
            EventType::Corporate => "corporate",
            EventType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

/// Payment progress of a booking. Transitions only
/// unpaid -> processing -> {paid | failed}; paid is terminal except for an
/// explicit administrative refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPaymentStatus {
    Unpaid,
    Processing,
    Paid,
    Failed,
    Refunded,
}

impl BookingPaymentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(BookingPaymentStatus::Unpaid),
            "processing" => Some(BookingPaymentStatus::Processing),
            "paid" => Some(BookingPaymentStatus::Paid),
            "failed" => Some(BookingPaymentStatus::Failed),
            "refunded" => Some(BookingPaymentStatus::Refunded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Unpaid => "unpaid",
            BookingPaymentStatus::Processing => "processing",
            BookingPaymentStatus::Paid => "paid",
            BookingPaymentStatus::Failed => "failed",
            BookingPaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_id: Option<Uuid>,
    /// Service price/name captured at booking time, immutable thereafter.
    pub service_snapshot: Option<Value>,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub guest_count: i32,
    pub duration_hours: i32,
    pub message: Option<String>,
    pub price_calculated: i64,
    pub status: String,
    pub payment_status: String,
    pub qr_code_url: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips() {
        for ty in EventType::ALL {
            assert_eq!(EventType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(EventType::parse("gala"), None);
    }

    #[test]
    fn payment_status_parses_known_values() {
        assert_eq!(
            BookingPaymentStatus::parse("processing"),
            Some(BookingPaymentStatus::Processing)
        );
        assert_eq!(BookingPaymentStatus::parse("PAID"), None);
    }
}
