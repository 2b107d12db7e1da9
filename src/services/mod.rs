pub mod checkout;
pub mod gateway;
pub mod order_locks;
pub mod orders;
pub mod reconciler;

pub use checkout::CheckoutService;
pub use gateway::{PaymentError, PaymentGateway};
pub use order_locks::OrderLocks;
pub use orders::OrderService;
pub use reconciler::{ReconcileOutcome, WebhookReconciler};
