pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod ports;
pub mod schemas;
pub mod services;
pub mod startup;
pub mod stripe;
pub mod utils;
pub mod validation;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::domain::Product;
use crate::ports::OrderStore;
use crate::services::{CheckoutService, OrderLocks, OrderService, PaymentGateway, WebhookReconciler};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub locks: OrderLocks,
    pub log_request_body: bool,
}

impl AppState {
    /// Wires the services around one store and one gateway. The reconciler and
    /// the record-order path share a single set of per-order locks.
    pub fn new(config: &Config, store: Arc<dyn OrderStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        let product = Product::catalog_item();
        let locks = OrderLocks::new();

        Self {
            checkout: Arc::new(CheckoutService::new(
                gateway,
                store.clone(),
                config.frontend_url.clone(),
                product,
            )),
            orders: Arc::new(OrderService::new(store.clone(), locks.clone())),
            reconciler: Arc::new(WebhookReconciler::new(
                store.clone(),
                locks.clone(),
                &config.stripe,
                &product,
            )),
            locks,
            store,
            log_request_body: config.log_request_body,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let log_body = state.log_request_body;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/checkout/create-session", post(handlers::checkout::create_session))
        .route("/api/payments/create-intent", post(handlers::payments::create_intent))
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::record_order),
        )
        .route("/api/orders/:id", get(handlers::orders::get_order))
        .route("/webhook", post(handlers::webhook::receive))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(axum::middleware::from_fn_with_state(
            log_body,
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}

/// CORS for the storefront frontend. Origins that are not valid header values
/// are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
