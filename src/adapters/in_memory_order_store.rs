//! In-memory implementation of OrderStore.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::Order;
use crate::ports::{OrderStore, StoreResult};

/// A thread-safe in-memory order store.
///
/// Used when no `DATABASE_URL` is configured and throughout the test suite.
/// Contents are lost on restart.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn upsert(&self, order: &Order) -> StoreResult<Order> {
        let mut orders = self.orders.write().await;
        let mut stored = order.clone();
        if let Some(existing) = orders.get(&order.id) {
            stored.created_at = existing.created_at;
        }
        orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().cloned().collect())
    }
}
