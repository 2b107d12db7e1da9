//! Typed view of the webhook events the storefront reacts to.

use serde::Deserialize;
use std::collections::HashMap;

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Generic webhook envelope; `data.object` is decoded according to `event_type`.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    amount: Option<i64>,
    amount_received: Option<i64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    payment_intent: Option<String>,
    payment_status: Option<String>,
    amount_total: Option<i64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Payment facts carried by a success or failure event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotice {
    /// Provider identifier of the payment attempt.
    pub reference: String,
    /// Amount actually received, else amount requested. Absent on failures.
    pub amount: Option<i64>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Succeeded(PaymentNotice),
    Failed(PaymentNotice),
    Ignored,
}

impl WebhookEvent {
    /// Decodes `data.object` for the event types that drive order state.
    pub fn classify(&self) -> Result<PaymentEvent, serde_json::Error> {
        match self.event_type.as_str() {
            PAYMENT_INTENT_SUCCEEDED => {
                let intent: PaymentIntentObject = serde_json::from_value(self.data.object.clone())?;
                Ok(PaymentEvent::Succeeded(PaymentNotice {
                    reference: intent.id,
                    amount: intent.amount_received.or(intent.amount),
                    metadata: intent.metadata,
                }))
            }
            PAYMENT_INTENT_FAILED => {
                let intent: PaymentIntentObject = serde_json::from_value(self.data.object.clone())?;
                Ok(PaymentEvent::Failed(PaymentNotice {
                    reference: intent.id,
                    amount: None,
                    metadata: intent.metadata,
                }))
            }
            CHECKOUT_SESSION_COMPLETED => {
                let session: CheckoutSessionObject =
                    serde_json::from_value(self.data.object.clone())?;
                if session.payment_status.as_deref() != Some("paid") {
                    return Ok(PaymentEvent::Ignored);
                }
                Ok(PaymentEvent::Succeeded(PaymentNotice {
                    reference: session.payment_intent.unwrap_or(session.id),
                    amount: session.amount_total,
                    metadata: session.metadata,
                }))
            }
            _ => Ok(PaymentEvent::Ignored),
        }
    }
}
