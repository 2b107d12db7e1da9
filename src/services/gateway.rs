//! Payment gateway port.
//!
//! The checkout flow talks to the payment processor only through this trait,
//! so tests can substitute a fake and the provider client stays swappable.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::Product;

/// Metadata keys attached to every provider artifact. The processor echoes them
/// back verbatim in webhook events.
pub const METADATA_ORDER_ID: &str = "orderId";
pub const METADATA_PRODUCT_NAME: &str = "productName";
pub const METADATA_AMOUNT: &str = "amount";

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("payment provider rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("payment provider request failed: {0}")]
    Transport(String),

    #[error("invalid response from payment provider: {0}")]
    InvalidResponse(String),

    #[error("payment provider temporarily unavailable")]
    Unavailable,
}

/// Order annotations that round-trip through the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMetadata {
    pub order_id: Uuid,
    pub product_name: String,
    pub amount: i64,
}

impl OrderMetadata {
    pub fn for_product(order_id: Uuid, product: &Product) -> Self {
        Self {
            order_id,
            product_name: product.name.to_string(),
            amount: product.amount,
        }
    }

    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            (METADATA_ORDER_ID, self.order_id.to_string()),
            (METADATA_PRODUCT_NAME, self.product_name.clone()),
            (METADATA_AMOUNT, self.amount.to_string()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub product: Product,
    pub metadata: OrderMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub product: Product,
    pub metadata: OrderMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted checkout page for a single unit of `request.product`.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession, PaymentError>;

    /// Creates a payment intent to be confirmed client-side.
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<CreatedPaymentIntent, PaymentError>;
}
