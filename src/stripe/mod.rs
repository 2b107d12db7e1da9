pub mod client;
pub mod events;
pub mod signature;

pub use client::StripeClient;
pub use events::{PaymentEvent, PaymentNotice, WebhookEvent};
