use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Admin-configured pricing override for one event type. When no row exists
/// the hardcoded defaults in `crate::pricing` apply.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    pub id: Uuid,
    pub event_type: String,
    pub base_price: i64,
    pub per_guest: i64,
    pub per_hour: i64,
    pub default_hours: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
