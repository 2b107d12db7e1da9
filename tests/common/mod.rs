#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use storefront_core::adapters::InMemoryOrderStore;
use storefront_core::config::{Config, StripeSettings};
use storefront_core::services::gateway::{
    CheckoutSessionRequest, CreatedCheckoutSession, CreatedPaymentIntent, PaymentError,
    PaymentGateway, PaymentIntentRequest,
};
use storefront_core::{create_app, AppState};

pub const WEBHOOK_SECRET: &str = "whsec_integration";

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        database_url: None,
        frontend_url: "http://localhost:5173".to_string(),
        stripe: StripeSettings {
            secret_key: "sk_test_integration".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            webhook_tolerance_secs: 300,
        },
        cors_allowed_origins: vec!["http://localhost:5173".to_string()],
        log_request_body: false,
    }
}

/// Gateway double that answers like the provider without any network.
#[derive(Default)]
pub struct FakeGateway {
    pub fail: bool,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, PaymentError> {
        if self.fail {
            return Err(PaymentError::Api {
                status: 401,
                message: "Invalid API Key provided".to_string(),
            });
        }
        let id = format!("cs_test_{}", request.metadata.order_id.simple());
        Ok(CreatedCheckoutSession {
            url: format!("https://checkout.stripe.test/c/pay/{}", id),
            id,
        })
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<CreatedPaymentIntent, PaymentError> {
        if self.fail {
            return Err(PaymentError::Transport("connection reset".to_string()));
        }
        let id = format!("pi_test_{}", request.metadata.order_id.simple());
        Ok(CreatedPaymentIntent {
            client_secret: format!("{}_secret_abc", id),
            id,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: InMemoryOrderStore,
}

pub fn test_app() -> TestApp {
    test_app_with_gateway(FakeGateway::default())
}

pub fn test_app_with_gateway(gateway: FakeGateway) -> TestApp {
    let store = InMemoryOrderStore::new();
    let state = AppState::new(&test_config(), Arc::new(store.clone()), Arc::new(gateway));
    TestApp {
        router: create_app(state.clone()),
        state,
        store,
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Builds a webhook delivery signed with the test secret at the current time.
pub fn signed_webhook(event: &Value) -> Request<Body> {
    let payload = event.to_string();
    let header = storefront_core::stripe::signature::sign(
        payload.as_bytes(),
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp(),
    )
    .unwrap();
    webhook_with_header(payload, &header)
}

pub fn webhook_with_header(payload: String, header: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("Stripe-Signature", header)
        .body(Body::from(payload))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
