use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::Payment;
use crate::services::notify;
use crate::services::payment as payment_service;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{success, Page};

const PROOF_FIELD: &str = "proof";
const PROOF_BUCKET: &str = "payments";
const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

fn proof_extension(content_type: Option<&str>) -> Result<&'static str, AppError> {
    match content_type {
        Some("image/png") => Ok("png"),
        Some("image/jpeg") => Ok("jpg"),
        Some("image/webp") => Ok("webp"),
        _ => Err(AppError::ValidationError(
            "Proof must be a PNG, JPEG or WebP image".to_string(),
        )),
    }
}

/// `POST /api/payments/:id/proof` — multipart upload of the transfer
/// evidence. Stores the image and stamps the payment; no status change.
pub async fn upload_proof(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut proof_url: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(PROOF_FIELD) {
            continue;
        }

        let ext = proof_extension(field.content_type())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read proof image: {e}")))?;

        if bytes.is_empty() {
            return Err(AppError::ValidationError(
                "Proof image is empty".to_string(),
            ));
        }
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(AppError::ValidationError(
                "Proof image exceeds the 5 MB limit".to_string(),
            ));
        }

        let file_name = format!("{}_{}.{}", id, Utc::now().timestamp(), ext);
        proof_url = Some(state.store.store(PROOF_BUCKET, &file_name, &bytes).await?);
    }

    let proof_url = proof_url
        .ok_or_else(|| AppError::ValidationError("Proof image is required".to_string()))?;

    let payment = payment_service::upload_proof(&state.pool, id, &auth, proof_url.clone()).await?;

    notify::record_audit(
        &state.pool,
        Some(auth.id),
        "upload_payment_proof",
        "payment",
        Some(id.to_string()),
        None,
        Some(json!({ "proofImageUrl": proof_url })),
    )
    .await?;

    Ok(success(payment, "Payment proof uploaded").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub simulate_success: Option<bool>,
}

/// `POST /api/payments/:id/process` — admin decision; `simulateSuccess`
/// (default true) approves, false rejects.
pub async fn process_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;
    let approve = req.simulate_success.unwrap_or(true);

    let payment = payment_service::process_payment(&state.pool, &state.store, id, approve).await?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    notify::record_audit(
        &state.pool,
        Some(auth.id),
        "process_payment",
        "payment",
        Some(id.to_string()),
        user_agent,
        Some(json!({ "simulateSuccess": approve, "status": payment.status })),
    )
    .await?;

    Ok(success(payment, "Payment processed successfully").into_response())
}

/// `GET /api/payments/:id` — owner or admin.
pub async fn get_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if !auth.is_admin() {
        let owner = payment_service::payment_owner(&state.pool, &payment).await?;
        if owner != Some(auth.id) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
    }

    Ok(success(payment, "Payment loaded").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
}

/// `GET /api/payments` — admin listing with status/method filters.
pub async fn list_payments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<Response, AppError> {
    auth.require_admin()?;
    let (page, limit, offset) = super::Pagination {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR payment_method = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(&query.status)
    .bind(&query.payment_method)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payments \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR payment_method = $2)",
    )
    .bind(&query.status)
    .bind(&query.payment_method)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(Page::new(payments, total, page, limit), "Payments loaded").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_extension_accepts_images_only() {
        assert_eq!(proof_extension(Some("image/png")).unwrap(), "png");
        assert_eq!(proof_extension(Some("image/jpeg")).unwrap(), "jpg");
        assert!(proof_extension(Some("application/pdf")).is_err());
        assert!(proof_extension(None).is_err());
    }
}
