//! Webhook-driven order reconciliation.
//!
//! State machine: PENDING -> PAID on a success event, PENDING -> FAILED on a
//! failure event. PAID and FAILED are not guarded; a later event for the same
//! order re-applies whatever transition it encodes (last write wins).

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::StripeSettings;
use crate::domain::{Order, OrderStatus, Product};
use crate::error::AppError;
use crate::ports::OrderStore;
use crate::services::gateway::{METADATA_AMOUNT, METADATA_ORDER_ID, METADATA_PRODUCT_NAME};
use crate::services::order_locks::OrderLocks;
use crate::stripe::signature;
use crate::stripe::{PaymentEvent, PaymentNotice, WebhookEvent};

/// What a delivered event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Paid(Order),
    Failed(Order),
    /// Unhandled type, undecodable object, or no order id in the metadata.
    Ignored,
}

/// Values used when an event names an order the store has never seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDefaults {
    pub product_name: String,
    pub amount: i64,
}

impl OrderDefaults {
    pub fn for_product(product: &Product) -> Self {
        Self {
            product_name: product.name.to_string(),
            amount: 0,
        }
    }
}

pub struct WebhookReconciler {
    store: Arc<dyn OrderStore>,
    locks: OrderLocks,
    webhook_secret: String,
    tolerance_secs: i64,
    defaults: OrderDefaults,
}

impl WebhookReconciler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        locks: OrderLocks,
        settings: &StripeSettings,
        product: &Product,
    ) -> Self {
        Self {
            store,
            locks,
            webhook_secret: settings.webhook_secret.clone(),
            tolerance_secs: settings.webhook_tolerance_secs,
            defaults: OrderDefaults::for_product(product),
        }
    }

    /// Verifies the signature over the raw body, then decodes the event.
    /// Nothing is trusted, or written, before verification passes.
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> Result<WebhookEvent, AppError> {
        let header = signature_header.ok_or(signature::SignatureError::MissingHeader)?;
        signature::verify(
            payload,
            header,
            &self.webhook_secret,
            self.tolerance_secs,
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            e
        })?;

        serde_json::from_slice::<WebhookEvent>(payload)
            .map_err(|e| AppError::BadRequest(format!("invalid event payload: {}", e)))
    }

    pub async fn handle(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ReconcileOutcome, AppError> {
        let event = self.verify(payload, signature_header)?;
        self.apply(&event).await
    }

    /// Applies an already verified event.
    pub async fn apply(&self, event: &WebhookEvent) -> Result<ReconcileOutcome, AppError> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received webhook event");

        let payment_event = match event.classify() {
            Ok(payment_event) => payment_event,
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Unable to decode webhook event object"
                );
                return Ok(ReconcileOutcome::Ignored);
            }
        };

        match payment_event {
            PaymentEvent::Succeeded(notice) => {
                let Some(order_id) = order_id_from(event, &notice)? else {
                    return Ok(ReconcileOutcome::Ignored);
                };
                let _guard = self.locks.lock(order_id).await;
                let mut order =
                    find_or_create(self.store.as_ref(), order_id, &notice.metadata, &self.defaults)
                        .await?;

                order.mark_paid(notice.reference, notice.amount);
                let saved = self.store.upsert(&order).await?;
                tracing::info!(
                    order_id = %saved.id,
                    payment_reference = ?saved.payment_reference,
                    amount = saved.amount,
                    "Order marked as PAID via webhook"
                );
                Ok(ReconcileOutcome::Paid(saved))
            }
            PaymentEvent::Failed(notice) => {
                let Some(order_id) = order_id_from(event, &notice)? else {
                    return Ok(ReconcileOutcome::Ignored);
                };
                let _guard = self.locks.lock(order_id).await;
                let mut order =
                    find_or_create(self.store.as_ref(), order_id, &notice.metadata, &self.defaults)
                        .await?;

                order.mark_failed(notice.reference);
                let saved = self.store.upsert(&order).await?;
                tracing::info!(
                    order_id = %saved.id,
                    payment_reference = ?saved.payment_reference,
                    "Order marked as FAILED via webhook"
                );
                Ok(ReconcileOutcome::Failed(saved))
            }
            PaymentEvent::Ignored => {
                tracing::debug!(event_type = %event.event_type, "Unhandled event type");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }
}

/// `Ok(None)` when the metadata carries no order id at all.
fn order_id_from(event: &WebhookEvent, notice: &PaymentNotice) -> Result<Option<Uuid>, AppError> {
    let Some(raw) = notice.metadata.get(METADATA_ORDER_ID) else {
        tracing::warn!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook event missing orderId metadata"
        );
        return Ok(None);
    };

    Uuid::parse_str(raw.trim()).map(Some).map_err(|_| {
        tracing::error!(
            event_id = %event.id,
            order_id = %raw,
            "Webhook event carries a malformed orderId"
        );
        AppError::Validation(format!("{}: must be a valid UUID", METADATA_ORDER_ID))
    })
}

/// Loads the order, or builds one from event metadata when it was never
/// persisted. Metadata wins over `defaults`; a metadata amount that is present
/// but not a non-negative integer rejects the event instead of being coerced.
pub async fn find_or_create(
    store: &dyn OrderStore,
    order_id: Uuid,
    metadata: &HashMap<String, String>,
    defaults: &OrderDefaults,
) -> Result<Order, AppError> {
    if let Some(existing) = store.find_by_id(order_id).await? {
        return Ok(existing);
    }

    let product_name = metadata
        .get(METADATA_PRODUCT_NAME)
        .filter(|name| !name.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| defaults.product_name.clone());

    let amount = match metadata.get(METADATA_AMOUNT).filter(|raw| !raw.trim().is_empty()) {
        None => defaults.amount,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(amount) if amount >= 0 => amount,
            _ => {
                tracing::error!(
                    %order_id,
                    amount = %raw,
                    "Webhook metadata carries an unparseable amount"
                );
                return Err(AppError::Validation(format!(
                    "{}: '{}' is not a valid amount",
                    METADATA_AMOUNT, raw
                )));
            }
        },
    };

    tracing::info!(%order_id, "No stored order for webhook event, creating one from metadata");
    Ok(Order::new(order_id, product_name, amount, None, OrderStatus::Pending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryOrderStore;
    use serde_json::json;

    const SECRET: &str = "whsec_unit";

    fn reconciler(store: InMemoryOrderStore) -> WebhookReconciler {
        let settings = StripeSettings {
            secret_key: "sk_test_unit".to_string(),
            webhook_secret: SECRET.to_string(),
            api_base: "http://localhost".to_string(),
            webhook_tolerance_secs: 300,
        };
        WebhookReconciler::new(
            Arc::new(store),
            OrderLocks::new(),
            &settings,
            &Product::catalog_item(),
        )
    }

    fn event(event_type: &str, object: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(json!({
            "id": "evt_unit",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_find_or_create_returns_existing() {
        let store = InMemoryOrderStore::new();
        let existing = Order::pending(Uuid::new_v4(), &Product::catalog_item(), None);
        store.upsert(&existing).await.unwrap();

        let defaults = OrderDefaults::for_product(&Product::catalog_item());
        let found = find_or_create(&store, existing.id, &metadata(&[("amount", "1")]), &defaults)
            .await
            .unwrap();
        assert_eq!(found, existing);
    }

    #[tokio::test]
    async fn test_find_or_create_uses_defaults() {
        let store = InMemoryOrderStore::new();
        let defaults = OrderDefaults::for_product(&Product::catalog_item());

        let order = find_or_create(&store, Uuid::new_v4(), &HashMap::new(), &defaults)
            .await
            .unwrap();
        assert_eq!(order.product_name, "Premium Wireless Headphones");
        assert_eq!(order.amount, 0);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_find_or_create_rejects_bad_amount() {
        let store = InMemoryOrderStore::new();
        let defaults = OrderDefaults::for_product(&Product::catalog_item());

        for raw in ["abc", "12.5", "-3"] {
            let result =
                find_or_create(&store, Uuid::new_v4(), &metadata(&[("amount", raw)]), &defaults).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "amount {:?}", raw);
        }
    }

    #[tokio::test]
    async fn test_success_marks_existing_order_paid() {
        let store = InMemoryOrderStore::new();
        let order = Order::pending(Uuid::new_v4(), &Product::catalog_item(), None);
        store.upsert(&order).await.unwrap();
        let reconciler = reconciler(store.clone());

        let outcome = reconciler
            .apply(&event(
                "payment_intent.succeeded",
                json!({"id": "pi_ok", "amount": 9999, "amount_received": 9999,
                       "metadata": {"orderId": order.id.to_string(), "amount": "9999"}}),
            ))
            .await
            .unwrap();

        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(outcome, ReconcileOutcome::Paid(stored.clone()));
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.payment_reference.as_deref(), Some("pi_ok"));
        assert_eq!(stored.created_at, order.created_at);
    }

    #[tokio::test]
    async fn test_late_failure_reapplies_over_paid() {
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(store.clone());
        let order_id = Uuid::new_v4();

        reconciler
            .apply(&event(
                "payment_intent.succeeded",
                json!({"id": "pi_first", "amount_received": 9999,
                       "metadata": {"orderId": order_id.to_string()}}),
            ))
            .await
            .unwrap();
        assert_eq!(
            store.find_by_id(order_id).await.unwrap().unwrap().status,
            OrderStatus::Paid
        );

        let outcome = reconciler
            .apply(&event(
                "payment_intent.payment_failed",
                json!({"id": "pi_second", "metadata": {"orderId": order_id.to_string()}}),
            ))
            .await
            .unwrap();

        let stored = store.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(outcome, ReconcileOutcome::Failed(stored.clone()));
        assert_eq!(stored.status, OrderStatus::Failed);
        assert_eq!(stored.payment_reference.as_deref(), Some("pi_second"));
        assert_eq!(stored.amount, 9999);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_creates_unknown_order() {
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(store.clone());
        let order_id = Uuid::new_v4();

        reconciler
            .apply(&event(
                "payment_intent.payment_failed",
                json!({"id": "pi_bad", "metadata": {"orderId": order_id.to_string(), "productName": "Widget", "amount": "500"}}),
            ))
            .await
            .unwrap();

        let stored = store.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
        assert_eq!(stored.product_name, "Widget");
        assert_eq!(stored.amount, 500);
        assert_eq!(stored.payment_reference.as_deref(), Some("pi_bad"));
    }

    #[tokio::test]
    async fn test_missing_order_id_is_ignored() {
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(store.clone());

        let outcome = reconciler
            .apply(&event(
                "payment_intent.succeeded",
                json!({"id": "pi_1", "amount": 100, "metadata": {}}),
            ))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Ignored);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_order_id_is_rejected() {
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(store.clone());

        let result = reconciler
            .apply(&event(
                "payment_intent.succeeded",
                json!({"id": "pi_1", "metadata": {"orderId": "O1"}}),
            ))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_rejects_bad_signature() {
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(store.clone());
        let payload = br#"{"id":"evt","type":"payment_intent.succeeded","data":{"object":{}}}"#;
        let header = signature::sign(payload, "whsec_wrong", chrono::Utc::now().timestamp()).unwrap();

        assert!(matches!(
            reconciler.handle(payload, Some(&header)).await,
            Err(AppError::Signature(signature::SignatureError::Mismatch))
        ));
        assert!(matches!(
            reconciler.handle(payload, None).await,
            Err(AppError::Signature(signature::SignatureError::MissingHeader))
        ));
    }

    #[tokio::test]
    async fn test_handle_rejects_invalid_json_after_valid_signature() {
        let reconciler = reconciler(InMemoryOrderStore::new());
        let payload = b"not json";
        let header = signature::sign(payload, SECRET, chrono::Utc::now().timestamp()).unwrap();

        assert!(matches!(
            reconciler.handle(payload, Some(&header)).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
