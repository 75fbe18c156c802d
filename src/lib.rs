//! # Cart Store
//!
//! A shopping cart state manager that validates every change against an
//! external stock service and keeps the cart in durable storage.
//!
//! ## Core Concepts
//!
//! - **Entries**: One per product, carrying the product's metadata and an amount of at least 1
//! - **Stock**: Increases are checked against the stock service before they commit
//! - **Snapshots**: Every commit publishes an immutable cart snapshot, then persists it
//! - **Notices**: Rejected mutations are reported to a notifier and leave the cart unchanged
//!
//! ## Example
//!
//! ```ignore
//! use cart_store::{CartConfig, CartStore, FileDurableStore, FileStoreConfig, ProductId};
//!
//! let durable = FileDurableStore::open(FileStoreConfig {
//!     path: "./cart".into(),
//!     ..Default::default()
//! })?;
//!
//! let store = CartStore::open(
//!     CartConfig::default(),
//!     Arc::new(HttpStockService::new(HttpStockConfig::default())?),
//!     Arc::new(TracingNotifier),
//!     Arc::new(durable),
//! );
//!
//! // Add a product
//! let cart = store.add_product(ProductId(3)).await?;
//!
//! // Watch the cart
//! store.on_change(|cart| println!("{} items", cart.item_count()));
//! ```

pub mod error;
pub mod notify;
pub mod persistence;
pub mod state;
pub mod stock;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{CartError, Result};
pub use notify::{Notice, NoticeKind, Notifier, RecordingNotifier, TracingNotifier};
pub use persistence::{
    decode_cart, encode_cart, DurableStore, FileDurableStore, FileStoreConfig, MemoryDurableStore,
    DEFAULT_CART_KEY,
};
pub use state::{apply_operation, CartOperation, CartState, Step};
#[cfg(feature = "http")]
pub use stock::{HttpStockConfig, HttpStockService};
pub use stock::{InMemoryStockService, StockService};
pub use store::{CartConfig, CartStore};
pub use subscriptions::{
    CartEvent, DropReason, SnapshotCallback, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
