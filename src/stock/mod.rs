//! Stock and product lookups.
//!
//! The cart consults a [`StockService`] before admitting any quantity
//! increase, and fetches product metadata once, when a product first enters
//! the cart.

mod memory;
#[cfg(feature = "http")]
mod http;

use crate::error::Result;
use crate::types::{Product, ProductId, StockRecord};
use async_trait::async_trait;

pub use memory::InMemoryStockService;
#[cfg(feature = "http")]
pub use http::{HttpStockConfig, HttpStockService};

/// Read-only access to stock levels and product metadata.
///
/// Any failure (network, missing product, undecodable body) is reported as
/// `CartError::Transport` or `CartError::MalformedResponse`.
#[async_trait]
pub trait StockService: Send + Sync {
    /// Current stock ceiling for a product.
    async fn get_stock(&self, product_id: ProductId) -> Result<StockRecord>;

    /// Product metadata.
    async fn get_product(&self, product_id: ProductId) -> Result<Product>;
}
