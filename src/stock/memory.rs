//! In-process stock service.

use super::StockService;
use crate::error::{CartError, Result};
use crate::types::{Product, ProductId, StockRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stock service backed by in-memory tables.
///
/// Unknown products fail the way a 404 from a remote service would. Products
/// can be marked unavailable to simulate transport failures.
#[derive(Debug, Default)]
pub struct InMemoryStockService {
    products: RwLock<HashMap<ProductId, Product>>,
    stock: RwLock<HashMap<ProductId, i64>>,
    unavailable: RwLock<HashSet<ProductId>>,
    stock_lookups: AtomicU64,
    product_lookups: AtomicU64,
}

impl InMemoryStockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product with its stock level.
    pub fn with_product(self, product: Product, stock: i64) -> Self {
        self.insert_product(product, stock);
        self
    }

    /// Register or replace a product and its stock level.
    pub fn insert_product(&self, product: Product, stock: i64) {
        let id = product.id;
        self.products.write().insert(id, product);
        self.stock.write().insert(id, stock);
    }

    /// Change the stock level of a product.
    pub fn set_stock(&self, product_id: ProductId, amount: i64) {
        self.stock.write().insert(product_id, amount);
    }

    /// Make every lookup for `product_id` fail (or succeed again).
    pub fn set_unavailable(&self, product_id: ProductId, unavailable: bool) {
        let mut set = self.unavailable.write();
        if unavailable {
            set.insert(product_id);
        } else {
            set.remove(&product_id);
        }
    }

    /// Number of `get_stock` calls served.
    pub fn stock_lookups(&self) -> u64 {
        self.stock_lookups.load(Ordering::SeqCst)
    }

    /// Number of `get_product` calls served.
    pub fn product_lookups(&self) -> u64 {
        self.product_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self, product_id: ProductId) -> Result<()> {
        if self.unavailable.read().contains(&product_id) {
            return Err(CartError::Transport(format!(
                "Stock service unavailable for product {}",
                product_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StockService for InMemoryStockService {
    async fn get_stock(&self, product_id: ProductId) -> Result<StockRecord> {
        self.stock_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available(product_id)?;

        self.stock
            .read()
            .get(&product_id)
            .map(|amount| StockRecord::new(product_id, *amount))
            .ok_or_else(|| CartError::Transport(format!("No stock record for {}", product_id)))
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.product_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available(product_id)?;

        self.products
            .read()
            .get(&product_id)
            .cloned()
            .ok_or_else(|| CartError::Transport(format!("No product {}", product_id)))
    }
}
