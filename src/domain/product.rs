//! The storefront sells exactly one item; its definition lives here.

/// A purchasable item, priced in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub name: &'static str,
    pub description: &'static str,
    pub amount: i64,
    pub currency: &'static str,
}

impl Product {
    /// The single catalog entry offered by the storefront.
    pub const fn catalog_item() -> Self {
        Product {
            name: "Premium Wireless Headphones",
            description: "Experience crisp audio with noise cancellation and 20-hour battery life.",
            amount: 9999,
            currency: "usd",
        }
    }
}
