//! Session/intent initiation.
//! Creates the provider artifact first and only then persists the PENDING order.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Order, Product};
use crate::error::AppError;
use crate::ports::OrderStore;
use crate::schemas::{CheckoutSessionResponse, PaymentIntentResponse};
use crate::services::gateway::{
    CheckoutSessionRequest, OrderMetadata, PaymentGateway, PaymentIntentRequest,
};

/// Placeholder the provider substitutes with the real session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn OrderStore>,
    frontend_url: String,
    product: Product,
}

impl CheckoutService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn OrderStore>,
        frontend_url: impl Into<String>,
        product: Product,
    ) -> Self {
        Self {
            gateway,
            store,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
            product,
        }
    }

    pub fn success_url(&self, order_id: Uuid) -> String {
        format!(
            "{}/success?session_id={}&orderId={}",
            self.frontend_url, SESSION_ID_PLACEHOLDER, order_id
        )
    }

    pub fn cancel_url(&self, order_id: Uuid) -> String {
        format!("{}/cancel?orderId={}", self.frontend_url, order_id)
    }

    pub async fn create_checkout_session(&self) -> Result<CheckoutSessionResponse, AppError> {
        let order_id = Uuid::new_v4();

        let session = self
            .gateway
            .create_checkout_session(CheckoutSessionRequest {
                product: self.product,
                metadata: OrderMetadata::for_product(order_id, &self.product),
                success_url: self.success_url(order_id),
                cancel_url: self.cancel_url(order_id),
            })
            .await
            .map_err(|e| {
                tracing::error!(%order_id, error = %e, "Failed to create checkout session");
                e
            })?;
        tracing::info!(session_id = %session.id, %order_id, "Created checkout session");

        // The payment intent does not exist until the customer pays on the hosted
        // page; the webhook fills in the reference.
        let order = Order::pending(order_id, &self.product, None);
        self.store.upsert(&order).await?;

        Ok(CheckoutSessionResponse {
            session_id: session.id,
            url: session.url,
            order_id: order_id.to_string(),
        })
    }

    pub async fn create_payment_intent(&self) -> Result<PaymentIntentResponse, AppError> {
        let order_id = Uuid::new_v4();

        let intent = self
            .gateway
            .create_payment_intent(PaymentIntentRequest {
                product: self.product,
                metadata: OrderMetadata::for_product(order_id, &self.product),
            })
            .await
            .map_err(|e| {
                tracing::error!(%order_id, error = %e, "Failed to create payment intent");
                e
            })?;
        tracing::info!(payment_intent_id = %intent.id, %order_id, "Created payment intent");

        let order = Order::pending(order_id, &self.product, Some(intent.id.clone()));
        self.store.upsert(&order).await?;

        Ok(PaymentIntentResponse {
            client_secret: intent.client_secret,
            order_id: order_id.to_string(),
            payment_intent_id: intent.id,
        })
    }
}
