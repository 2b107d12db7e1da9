//! Persistence ports.
//! The services depend on these traits, never on a concrete database.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::Order;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt order row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence for orders, keyed by order id.
///
/// A single `upsert` is atomic. There is no compare-and-swap: callers that read,
/// modify and write back must serialize among themselves (see `OrderLocks`).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts or replaces the order with the same id. An existing row keeps its
    /// original `created_at`.
    async fn upsert(&self, order: &Order) -> StoreResult<Order>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// All orders. No ordering is guaranteed.
    async fn list_all(&self) -> StoreResult<Vec<Order>>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
