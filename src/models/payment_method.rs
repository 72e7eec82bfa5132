use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Receiving-party details shown to the payer as part of the payment
/// instructions for one manual channel.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodConfig {
    pub id: Uuid,
    pub method: String,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_account_number: Option<String>,
    pub note: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
