//! Core types for the cart store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Identifier of a purchasable product.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Debug for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProductId({})", self.0)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        ProductId(id)
    }
}

/// Commit counter carried by every snapshot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Revision(pub u64);

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev({})", self.0)
    }
}

impl Revision {
    pub fn next(self) -> Self {
        Revision(self.0 + 1)
    }
}

/// Stock level reported by the stock service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,

    /// Ceiling on the total quantity the cart may hold for this product.
    pub amount: i64,
}

impl StockRecord {
    pub fn new(id: ProductId, amount: i64) -> Self {
        Self {
            id: Some(id),
            amount,
        }
    }

    /// Whether `requested` units fit within this stock level.
    pub fn admits(&self, requested: i64) -> bool {
        requested <= self.amount
    }
}

/// Product metadata as returned by the stock service.
///
/// Everything except `id` is opaque to the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            attributes: Map::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// One product line in the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(rename = "id")]
    pub product_id: ProductId,

    /// Always >= 1 while the entry is in a cart.
    pub amount: u32,

    /// Metadata copied from the product lookup when the entry was created.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CartEntry {
    /// Build a fresh entry from product metadata.
    ///
    /// A metadata key named `amount` is dropped; the cart owns that field.
    pub fn from_product(product: Product, amount: u32) -> Self {
        let mut attributes = product.attributes;
        attributes.remove("amount");
        Self {
            product_id: product.id,
            amount,
            attributes,
        }
    }

    /// Copy of this entry with a different amount.
    pub fn with_amount(&self, amount: u32) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    /// Look up a metadata attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Input for amount-changing operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountUpdate {
    #[serde(rename = "productId")]
    pub product_id: ProductId,

    /// Requested amount. Signed so non-positive targets can be expressed (and rejected).
    pub amount: i64,
}

impl AmountUpdate {
    pub fn new(product_id: impl Into<ProductId>, amount: i64) -> Self {
        Self {
            product_id: product_id.into(),
            amount,
        }
    }
}

/// Immutable snapshot of the cart.
///
/// Cloning is cheap; entries are shared with the store and never mutated.
#[derive(Clone, Debug)]
pub struct Cart {
    entries: Arc<[CartEntry]>,
    revision: Revision,
}

impl Cart {
    pub(crate) fn new(entries: Vec<CartEntry>, revision: Revision) -> Self {
        Self {
            entries: entries.into(),
            revision,
        }
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn get(&self, product_id: ProductId) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.product_id == product_id)
    }

    /// Amount held for a product (0 when absent).
    pub fn amount_of(&self, product_id: ProductId) -> u32 {
        self.get(product_id).map(|e| e.amount).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of units across all entries.
    pub fn item_count(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.amount)).sum()
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = &CartEntry> {
        self.entries.iter()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(Vec::new(), Revision::default())
    }
}

impl PartialEq for Cart {
    /// Snapshots compare by content; the revision is bookkeeping.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
