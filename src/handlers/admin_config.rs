use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthUser;
use crate::models::{EventType, PaymentMethod, PaymentMethodConfig, PricingRule};
use crate::services::notify;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// `GET /api/admin-config/pricing-rules`
pub async fn get_pricing_rules(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let rules = sqlx::query_as::<_, PricingRule>(
        "SELECT * FROM pricing_rules ORDER BY event_type ASC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(success(json!({ "rules": rules }), "Pricing rules loaded").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPricingRuleRequest {
    pub base_price: i64,
    pub per_guest: i64,
    pub per_hour: i64,
    pub default_hours: i32,
}

/// `PUT /api/admin-config/pricing-rules/:eventType` — upsert the override
/// consumed by the pricing resolver.
pub async fn upsert_pricing_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_type): Path<String>,
    Json(req): Json<UpsertPricingRuleRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let event_type = EventType::parse(&event_type)
        .ok_or_else(|| AppError::ValidationError("Invalid event type".to_string()))?;

    if req.base_price < 0 || req.per_guest < 0 || req.per_hour < 0 {
        return Err(AppError::ValidationError(
            "Prices must not be negative".to_string(),
        ));
    }
    if req.default_hours < 1 {
        return Err(AppError::ValidationError(
            "defaultHours must be at least 1".to_string(),
        ));
    }

    let rule = sqlx::query_as::<_, PricingRule>(
        "INSERT INTO pricing_rules (event_type, base_price, per_guest, per_hour, default_hours) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (event_type) DO UPDATE SET \
         base_price = EXCLUDED.base_price, per_guest = EXCLUDED.per_guest, \
         per_hour = EXCLUDED.per_hour, default_hours = EXCLUDED.default_hours, \
         updated_at = now() \
         RETURNING *",
    )
    .bind(event_type.as_str())
    .bind(req.base_price)
    .bind(req.per_guest)
    .bind(req.per_hour)
    .bind(req.default_hours)
    .fetch_one(&state.pool)
    .await?;

    notify::record_audit(
        &state.pool,
        Some(auth.id),
        "upsert_pricing_rule",
        "pricing_rule",
        Some(rule.id.to_string()),
        None,
        Some(json!({
            "eventType": rule.event_type,
            "basePrice": rule.base_price,
            "perGuest": rule.per_guest,
            "perHour": rule.per_hour,
            "defaultHours": rule.default_hours,
        })),
    )
    .await?;

    Ok(success(rule, "Pricing rule saved").into_response())
}

/// `GET /api/admin-config/payment-methods`
pub async fn get_payment_method_configs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let configs = sqlx::query_as::<_, PaymentMethodConfig>(
        "SELECT * FROM payment_method_configs ORDER BY method ASC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(success(json!({ "configs": configs }), "Payment method configs loaded").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPaymentMethodRequest {
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_account_number: Option<String>,
    pub note: Option<String>,
    pub active: Option<bool>,
}

/// `PUT /api/admin-config/payment-methods/:method` — the method segment is
/// alias-normalized before the upsert.
pub async fn upsert_payment_method_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(method): Path<String>,
    Json(req): Json<UpsertPaymentMethodRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let method = PaymentMethod::parse(&method)
        .ok_or_else(|| AppError::ValidationError("Invalid payment method".to_string()))?;

    let config = sqlx::query_as::<_, PaymentMethodConfig>(
        "INSERT INTO payment_method_configs \
         (method, receiver_name, receiver_phone, receiver_account_number, note, active) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (method) DO UPDATE SET \
         receiver_name = EXCLUDED.receiver_name, receiver_phone = EXCLUDED.receiver_phone, \
         receiver_account_number = EXCLUDED.receiver_account_number, note = EXCLUDED.note, \
         active = EXCLUDED.active, updated_at = now() \
         RETURNING *",
    )
    .bind(method.as_str())
    .bind(&req.receiver_name)
    .bind(&req.receiver_phone)
    .bind(&req.receiver_account_number)
    .bind(&req.note)
    .bind(req.active.unwrap_or(true))
    .fetch_one(&state.pool)
    .await?;

    notify::record_audit(
        &state.pool,
        Some(auth.id),
        "upsert_payment_method_config",
        "payment_method_config",
        Some(config.id.to_string()),
        None,
        Some(json!({ "method": config.method, "active": config.active })),
    )
    .await?;

    Ok(success(config, "Payment method config saved").into_response())
}
