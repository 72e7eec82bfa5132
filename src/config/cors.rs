use axum::http::{header, HeaderValue, Method};
use std::env;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEV_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Builds the CORS layer from `CORS_ALLOWED_ORIGINS` (comma separated).
/// With no valid origins configured the layer falls back to a permissive
/// development mode without credentials.
pub fn cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let origins = parse_origins(
        &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEV_ORIGINS.to_string()),
    );
    if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured, allowing any origin");
        layer.allow_origin(AllowOrigin::any())
    } else {
        tracing::info!("CORS allowing {} origin(s)", origins.len());
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("ignoring invalid CORS origin {s:?}: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_origins() {
        let origins = parse_origins("http://localhost:3000, https://meskel.example.com");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");
    }

    #[test]
    fn skips_blank_and_invalid_entries() {
        let origins = parse_origins(" ,http://ok.example,\u{7f}bad");
        assert_eq!(origins.len(), 1);
    }

    #[test]
    fn dev_defaults_are_valid_header_values() {
        assert_eq!(parse_origins(DEV_ORIGINS).len(), 2);
    }
}
