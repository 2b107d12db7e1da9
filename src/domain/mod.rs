//! Framework-agnostic domain types.

pub mod order;
pub mod product;

pub use order::{Order, OrderStatus, ParseOrderStatusError};
pub use product::Product;
