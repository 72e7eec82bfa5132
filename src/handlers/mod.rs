use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::utils::response::success;

pub mod admin_config;
pub mod bookings;
pub mod events;
pub mod notifications;
pub mod payments;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "meskel-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Common `?page=&limit=` query parameters for listing endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Clamped (page, limit, offset) with the defaults the API documents.
    pub fn resolve(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (page, limit, (page - 1) * limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let (page, limit, offset) = Pagination {
            page: None,
            limit: None,
        }
        .resolve();
        assert_eq!((page, limit, offset), (1, 20, 0));

        let (page, limit, offset) = Pagination {
            page: Some(3),
            limit: Some(500),
        }
        .resolve();
        assert_eq!((page, limit, offset), (3, 100, 200));

        let (page, _, offset) = Pagination {
            page: Some(0),
            limit: Some(10),
        }
        .resolve();
        assert_eq!((page, offset), (1, 0));
    }
}
