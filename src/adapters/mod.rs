pub mod in_memory_order_store;
pub mod postgres_order_store;

pub use in_memory_order_store::InMemoryOrderStore;
pub use postgres_order_store::PostgresOrderStore;
