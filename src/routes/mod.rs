use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::cors_layer;
use crate::handlers::{admin_config, bookings, events, health_check, notifications, payments};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/calc-price", post(bookings::calc_price))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/proceed-payment", post(bookings::proceed_payment))
        .route("/bookings/:id/status", put(bookings::update_status))
        .route("/bookings/:id/qrcode", get(bookings::get_qrcode))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/:id", get(events::get_event).put(events::update_event))
        .route("/events/:id/proceed-payment", post(events::proceed_payment))
        .route("/payments", get(payments::list_payments))
        .route("/payments/:id", get(payments::get_payment))
        .route("/payments/:id/proof", post(payments::upload_proof))
        .route("/payments/:id/process", post(payments::process_payment))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", put(notifications::mark_read))
        .route(
            "/admin-config/pricing-rules",
            get(admin_config::get_pricing_rules),
        )
        .route(
            "/admin-config/pricing-rules/:eventType",
            put(admin_config::upsert_pricing_rule),
        )
        .route(
            "/admin-config/payment-methods",
            get(admin_config::get_payment_method_configs),
        )
        .route(
            "/admin-config/payment-methods/:method",
            put(admin_config::upsert_payment_method_config),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}
