//! Order domain entity.
//! A single purchase attempt, tracked from initiation to its payment outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status '{0}'")]
pub struct ParseOrderStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    /// Accepts any casing: `paid`, `Paid` and `PAID` are the same status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseOrderStatusError(s.to_string()))
    }
}

/// Domain entity representing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub product_name: String,
    /// Minor currency units.
    pub amount: i64,
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: Uuid,
        product_name: String,
        amount: i64,
        payment_reference: Option<String>,
        status: OrderStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            product_name,
            amount,
            payment_reference,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// A freshly initiated order for `product`, awaiting its payment outcome.
    pub fn pending(id: Uuid, product: &Product, payment_reference: Option<String>) -> Self {
        Self::new(
            id,
            product.name.to_string(),
            product.amount,
            payment_reference,
            OrderStatus::Pending,
        )
    }

    /// Records a successful payment. `amount` replaces the stored amount when known.
    pub fn mark_paid(&mut self, payment_reference: String, amount: Option<i64>) {
        self.status = OrderStatus::Paid;
        self.payment_reference = Some(payment_reference);
        if let Some(amount) = amount {
            self.amount = amount;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, payment_reference: String) {
        self.status = OrderStatus::Failed;
        self.payment_reference = Some(payment_reference);
        self.updated_at = Utc::now();
    }

    /// Overwrites every mutable field; `id` and `created_at` are left untouched.
    pub fn overwrite(
        &mut self,
        product_name: String,
        amount: i64,
        payment_reference: String,
        status: OrderStatus,
    ) {
        self.product_name = product_name;
        self.amount = amount;
        self.payment_reference = Some(payment_reference);
        self.status = status;
        self.updated_at = Utc::now();
    }
}
