//! Record-order use case plus order reads.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Order;
use crate::error::AppError;
use crate::ports::OrderStore;
use crate::services::order_locks::OrderLocks;
use crate::validation::RecordOrder;

/// Applies client-reported order outcomes.
///
/// Shares `OrderLocks` with the webhook reconciler; across processes a
/// client report and a webhook for the same order remain last-write-wins.
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    locks: OrderLocks,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, locks: OrderLocks) -> Self {
        Self { store, locks }
    }

    pub async fn list(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))
    }

    /// Overwrites every mutable field of the order, creating it when unknown.
    /// `created_at` survives from the stored row.
    pub async fn record(&self, cmd: RecordOrder) -> Result<Order, AppError> {
        let _guard = self.locks.lock(cmd.order_id).await;

        let order = match self.store.find_by_id(cmd.order_id).await? {
            Some(mut existing) => {
                existing.overwrite(cmd.product_name, cmd.amount, cmd.payment_reference, cmd.status);
                existing
            }
            None => Order::new(
                cmd.order_id,
                cmd.product_name,
                cmd.amount,
                Some(cmd.payment_reference),
                cmd.status,
            ),
        };

        let saved = self.store.upsert(&order).await?;
        tracing::info!(
            order_id = %saved.id,
            status = %saved.status,
            payment_reference = ?saved.payment_reference,
            "Recorded order"
        );
        Ok(saved)
    }
}
