use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::StripeSettings;
use crate::services::gateway::{
    CheckoutSessionRequest, CreatedCheckoutSession, CreatedPaymentIntent, OrderMetadata,
    PaymentError, PaymentGateway, PaymentIntentRequest,
};

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_RESET_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
}

/// Error envelope returned by the provider on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// HTTP client for the Stripe REST API.
///
/// Calls are never retried. A consecutive-failures circuit breaker makes the
/// client fail fast while the provider is down.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl StripeClient {
    pub fn new(settings: &StripeSettings) -> Result<Self, reqwest::Error> {
        Self::with_circuit_breaker(
            settings,
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_RESET_TIMEOUT_SECS,
        )
    }

    pub fn with_circuit_breaker(
        settings: &StripeSettings,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        Ok(StripeClient {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            secret_key: settings.secret_key.clone(),
            circuit_breaker,
        })
    }

    /// Returns the current state of the circuit breaker
    #[cfg(test)]
    fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    async fn post_form<T>(&self, path: &str, form: Vec<(String, String)>) -> Result<T, PaymentError>
    where
        T: for<'de> Deserialize<'de> + Send + 'static,
    {
        let url = format!("{}{}", self.api_base, path);
        let client = self.client.clone();
        let secret_key = self.secret_key.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .basic_auth(&secret_key, None::<&str>)
                    .form(&form)
                    .send()
                    .await
                    .map_err(|e| PaymentError::Transport(e.without_url().to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(PaymentError::Api {
                        status: status.as_u16(),
                        message: provider_error_message(&body),
                    });
                }

                response
                    .json::<T>()
                    .await
                    .map_err(|e| PaymentError::InvalidResponse(e.without_url().to_string()))
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(PaymentError::Unavailable),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

fn provider_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match (envelope.error.kind, envelope.error.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (None, Some(message)) => message,
            (Some(kind), None) => kind,
            (None, None) => "unknown error".to_string(),
        },
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

fn push_metadata(form: &mut Vec<(String, String)>, prefix: &str, metadata: &OrderMetadata) {
    for (key, value) in metadata.pairs() {
        form.push((format!("{}[{}]", prefix, key), value));
    }
}

fn checkout_session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let product = &request.product;
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            product.currency.to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            product.amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            product.name.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][description]".to_string(),
            product.description.to_string(),
        ),
    ];
    push_metadata(&mut form, "metadata", &request.metadata);
    push_metadata(&mut form, "payment_intent_data[metadata]", &request.metadata);
    form
}

fn payment_intent_form(request: &PaymentIntentRequest) -> Vec<(String, String)> {
    let product = &request.product;
    let mut form = vec![
        ("amount".to_string(), product.amount.to_string()),
        ("currency".to_string(), product.currency.to_string()),
        ("capture_method".to_string(), "automatic".to_string()),
        ("description".to_string(), product.name.to_string()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    push_metadata(&mut form, "metadata", &request.metadata);
    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, PaymentError> {
        let session: CheckoutSessionResponse = self
            .post_form("/v1/checkout/sessions", checkout_session_form(&request))
            .await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::InvalidResponse(format!("checkout session {} has no url", session.id))
        })?;

        Ok(CreatedCheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<CreatedPaymentIntent, PaymentError> {
        let intent: PaymentIntentResponse = self
            .post_form("/v1/payment_intents", payment_intent_form(&request))
            .await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::InvalidResponse(format!("payment intent {} has no client secret", intent.id))
        })?;

        Ok(CreatedPaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;
    use mockito::Matcher;
    use uuid::Uuid;

    fn settings(api_base: String) -> StripeSettings {
        StripeSettings {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: "whsec_test".to_string(),
            api_base,
            webhook_tolerance_secs: 300,
        }
    }

    fn session_request(order_id: Uuid) -> CheckoutSessionRequest {
        let product = Product::catalog_item();
        CheckoutSessionRequest {
            product,
            metadata: OrderMetadata::for_product(order_id, &product),
            success_url: "http://localhost:5173/success".to_string(),
            cancel_url: "http://localhost:5173/cancel".to_string(),
        }
    }

    #[test]
    fn test_checkout_form_carries_metadata_twice() {
        let order_id = Uuid::new_v4();
        let form = checkout_session_form(&session_request(order_id));

        let order_id = order_id.to_string();
        assert!(form.contains(&("metadata[orderId]".to_string(), order_id.clone())));
        assert!(form.contains(&(
            "payment_intent_data[metadata][orderId]".to_string(),
            order_id
        )));
        assert!(form.contains(&("mode".to_string(), "payment".to_string())));
    }

    #[test]
    fn test_provider_error_message() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such price"}}"#;
        assert_eq!(
            provider_error_message(body),
            "invalid_request_error: No such price"
        );
        assert_eq!(provider_error_message(""), "empty response body");
        assert_eq!(provider_error_message("oops"), "oops");
    }

    #[test]
    fn test_circuit_breaker_state() {
        let client = StripeClient::new(&settings("https://api.stripe.com".to_string())).unwrap();
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn test_create_checkout_session_with_mock() {
        let mut server = mockito::Server::new_async().await;
        let order_id = Uuid::new_v4();

        let mock = server
            .mock("POST", "/v1/checkout/sessions")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("metadata[orderId]".into(), order_id.to_string()),
                Matcher::UrlEncoded("line_items[0][price_data][unit_amount]".into(), "9999".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"cs_test_1","url":"https://checkout.stripe.com/c/pay/cs_test_1"}"#)
            .create_async()
            .await;

        let client = StripeClient::new(&settings(server.url())).unwrap();
        let session = client
            .create_checkout_session(session_request(order_id))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_1");
    }

    #[tokio::test]
    async fn test_create_payment_intent_with_mock() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/payment_intents")
            .match_body(Matcher::UrlEncoded("currency".into(), "usd".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"pi_1","client_secret":"pi_1_secret_abc"}"#)
            .create_async()
            .await;

        let product = Product::catalog_item();
        let client = StripeClient::new(&settings(server.url())).unwrap();
        let intent = client
            .create_payment_intent(PaymentIntentRequest {
                product,
                metadata: OrderMetadata::for_product(Uuid::new_v4(), &product),
            })
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_1");
        assert_eq!(intent.client_secret, "pi_1_secret_abc");
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/payment_intents")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"type":"invalid_request_error","message":"Invalid API Key provided"}}"#)
            .create_async()
            .await;

        let product = Product::catalog_item();
        let client = StripeClient::new(&settings(server.url())).unwrap();
        let result = client
            .create_payment_intent(PaymentIntentRequest {
                product,
                metadata: OrderMetadata::for_product(Uuid::new_v4(), &product),
            })
            .await;

        match result {
            Err(PaymentError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("Invalid API Key"));
                assert!(!message.contains("sk_test_123"));
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/payment_intents")
            .with_status(500)
            .expect_at_least(2)
            .create_async()
            .await;

        let product = Product::catalog_item();
        let client = StripeClient::with_circuit_breaker(&settings(server.url()), 2, 60).unwrap();
        let request = PaymentIntentRequest {
            product,
            metadata: OrderMetadata::for_product(Uuid::new_v4(), &product),
        };

        for _ in 0..2 {
            let _ = client.create_payment_intent(request.clone()).await;
        }

        let result = client.create_payment_intent(request).await;
        assert!(matches!(result, Err(PaymentError::Unavailable)));
    }
}
