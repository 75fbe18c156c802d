//! Subscription types for cart snapshots.

use crate::types::Cart;
use std::sync::Arc;

/// Configuration for a channel subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping the subscriber.
    /// Default: 64
    pub buffer_size: usize,

    /// Whether the first event is the current snapshot.
    /// Default: true
    pub send_initial: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64,
            send_initial: true,
        }
    }
}

/// Events delivered to channel subscribers.
#[derive(Clone, Debug)]
pub enum CartEvent {
    /// A committed cart snapshot.
    Snapshot(Cart),

    /// Subscription was dropped; no further events follow.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked with every committed snapshot.
pub type SnapshotCallback = Arc<dyn Fn(&Cart) + Send + Sync>;

/// Handle to a channel subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<CartEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<CartEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<CartEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<CartEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain all buffered snapshots, oldest first.
    pub fn drain_snapshots(&self) -> Vec<Cart> {
        self.receiver
            .try_iter()
            .filter_map(|event| match event {
                CartEvent::Snapshot(cart) => Some(cart),
                CartEvent::Dropped { .. } => None,
            })
            .collect()
    }
}
