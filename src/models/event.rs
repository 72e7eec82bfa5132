use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "published" => Some(EventStatus::Published),
            "cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

/// A ticketed, publicly listable occurrence. `total_tickets = NULL` means
/// unlimited capacity. Remaining capacity is always derived from completed
/// payments, never stored (see `crate::inventory`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub location: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub ticket_price: i64,
    pub total_tickets: Option<i32>,
    pub status: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published.as_str()
    }
}

/// Public listing shape: the event plus its derived remaining capacity
/// (`None` when capacity is unlimited).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithRemaining {
    #[serde(flatten)]
    pub event: Event,
    pub remaining_tickets: Option<i32>,
}
