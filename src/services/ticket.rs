//! Ticket Issuance: renders a completed payment's details into a scannable
//! QR code image and stores it under the upload root.
//!
//! Issuance failure is non-fatal to the approval that triggered it: the
//! caller logs and continues with `qr_code_url` left null.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Luma};
use qrcode::QrCode;
use thiserror::Error;

use crate::models::Payment;
use crate::utils::storage::FileStore;

const QR_BUCKET: &str = "qrcodes";
const QR_MIN_DIMENSION: u32 = 300;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("PNG rendering failed: {0}")]
    Render(#[from] image::ImageError),

    #[error("Failed to store ticket artifact: {0}")]
    Store(String),
}

/// Plain structured text embedded in the QR code.
pub fn ticket_payload(
    amount: i64,
    currency: &str,
    payment_method: &str,
    phone_number: Option<&str>,
    transaction_id: &str,
    date: &str,
) -> String {
    format!(
        "Payment Details:\n\
         Amount: {amount} {currency}\n\
         Payment Method: {payment_method}\n\
         Phone Number: {phone}\n\
         Transaction ID: {transaction_id}\n\
         Date: {date}",
        phone = phone_number.unwrap_or("-"),
    )
}

fn render_png(payload: &str) -> Result<Vec<u8>, TicketError> {
    let code = QrCode::new(payload.as_bytes())?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::L8,
    )?;
    Ok(png)
}

/// Generates and stores the artifact for a payment, returning its URL.
pub async fn issue_ticket(store: &FileStore, payment: &Payment) -> Result<String, TicketError> {
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let payload = ticket_payload(
        payment.amount,
        &payment.currency,
        &payment.payment_method,
        payment.phone_number.as_deref(),
        payment.transaction_id.as_deref().unwrap_or(""),
        &date,
    );

    let png = render_png(&payload)?;
    let file_name = format!("payment_{}.png", payment.id);

    store
        .store(QR_BUCKET, &file_name, &png)
        .await
        .map_err(|e| TicketError::Store(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_all_fields() {
        let payload = ticket_payload(
            26_500,
            "ETB",
            "telebirr",
            Some("0911223344"),
            "AB12CD34EF56AB78",
            "2026-08-29",
        );
        assert!(payload.starts_with("Payment Details:"));
        assert!(payload.contains("Amount: 26500 ETB"));
        assert!(payload.contains("Payment Method: telebirr"));
        assert!(payload.contains("Phone Number: 0911223344"));
        assert!(payload.contains("Transaction ID: AB12CD34EF56AB78"));
        assert!(payload.contains("Date: 2026-08-29"));
    }

    #[test]
    fn payload_tolerates_missing_phone() {
        let payload = ticket_payload(500, "ETB", "cbe", None, "X", "2026-01-01");
        assert!(payload.contains("Phone Number: -"));
    }

    #[test]
    fn rendering_produces_a_png() {
        let png = render_png("Payment Details:\nAmount: 1 ETB").unwrap();
        // PNG signature
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']);
    }
}
