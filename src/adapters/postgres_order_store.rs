//! Postgres implementation of OrderStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderStore, StoreError, StoreResult};

const ORDER_COLUMNS: &str =
    "id, product_name, amount, payment_reference, status, created_at, updated_at";

/// Postgres-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn upsert(&self, order: &Order) -> StoreResult<Order> {
        // created_at is deliberately absent from the update list.
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (
                id, product_name, amount, payment_reference, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                product_name = EXCLUDED.product_name,
                amount = EXCLUDED.amount,
                payment_reference = EXCLUDED.payment_reference,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(&order.product_name)
        .bind(order.amount)
        .bind(&order.payment_reference)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_domain).transpose()
    }

    async fn list_all(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_domain).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    product_name: String,
    amount: i64,
    payment_reference: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_domain(self) -> StoreResult<Order> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt {
                id: self.id,
                reason: e.to_string(),
            })?;

        Ok(Order {
            id: self.id,
            product_name: self.product_name,
            amount: self.amount,
            payment_reference: self.payment_reference,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
