//! Error types for the cart store.

use crate::types::ProductId;
use thiserror::Error;

/// Main error type for cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Stock exceeded for product {product_id}: requested {requested}, available {available}")]
    StockExceeded {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("Product not in cart: {0}")]
    EntryNotFound(ProductId),

    #[error("Invalid amount transition for product {product_id}: {current:?} -> {target}")]
    InvalidTransition {
        product_id: ProductId,
        current: Option<u32>,
        target: i64,
    },

    #[error("Stock service error: {0}")]
    Transport(String),

    #[error("Malformed stock service response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error("Storage is locked by another process")]
    Locked,

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CartError {
    /// Whether the failure came from the stock service rather than cart rules.
    pub fn is_transport(&self) -> bool {
        matches!(self, CartError::Transport(_) | CartError::MalformedResponse(_))
    }
}

impl From<serde_json::Error> for CartError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            CartError::Deserialization(e.to_string())
        } else {
            CartError::Serialization(e.to_string())
        }
    }
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
