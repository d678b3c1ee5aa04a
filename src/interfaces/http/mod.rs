//! HTTP surface: order initiation for the booking UI and the gateway callback.

pub mod handlers;

use crate::application::payment_service::PaymentService;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

pub const INITIATE_PATH: &str = "/api/payment/initiate";
pub const CALLBACK_PATH: &str = "/api/payment/callback";

pub fn router(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route(INITIATE_PATH, post(handlers::initiate_payment))
        .route(CALLBACK_PATH, post(handlers::payment_callback))
        .route("/health", get(handlers::health))
        .with_state(service)
}
