//! Durable storage for the cart blob.
//!
//! The cart lives in a single named slot of a key-value store as a JSON array
//! of entries. Stores are synchronous: a commit writes the slot before the
//! next commit starts.

mod codec;
mod file;
mod memory;

use crate::error::Result;

pub use codec::{decode_cart, encode_cart};
pub use file::{FileDurableStore, FileStoreConfig};
pub use memory::MemoryDurableStore;

/// Slot key the cart is stored under unless configured otherwise.
pub const DEFAULT_CART_KEY: &str = "@RocketShoes:cart";

/// Key-value blob store with string values.
pub trait DurableStore: Send + Sync {
    /// Read a slot. `Ok(None)` when nothing was ever written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a slot.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
