//! Snapshot publication.
//!
//! Every successful commit publishes the new cart snapshot to:
//! - channel subscribers (bounded buffers, slow subscribers are dropped)
//! - registered callbacks
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig::default());
//!
//! loop {
//!     match handle.recv() {
//!         Ok(CartEvent::Snapshot(cart)) => render(&cart),
//!         Ok(CartEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    CartEvent, DropReason, SnapshotCallback, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId,
};
