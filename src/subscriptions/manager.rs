//! Subscription manager for publishing cart snapshots.

use crate::types::Cart;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::types::{
    CartEvent, DropReason, SnapshotCallback, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId,
};

/// Internal subscriber state.
#[derive(Clone)]
enum Subscriber {
    Channel(Sender<CartEvent>),
    Callback(SnapshotCallback),
}

impl Subscriber {
    /// Deliver a snapshot. Returns false if a channel buffer is full or closed.
    fn deliver(&self, cart: &Cart) -> bool {
        match self {
            Subscriber::Channel(sender) => sender.try_send(CartEvent::Snapshot(cart.clone())).is_ok(),
            Subscriber::Callback(callback) => {
                callback(cart);
                true
            }
        }
    }

    fn notify_dropped(&self, reason: DropReason) {
        if let Subscriber::Channel(sender) = self {
            let _ = sender.try_send(CartEvent::Dropped { reason });
        }
    }
}

/// Subscribers plus the snapshot they were last sent.
#[derive(Default)]
struct Registry {
    subscribers: HashMap<SubscriptionId, Subscriber>,
    /// Last published snapshot; new channel subscribers start from it.
    current: Option<Cart>,
}

/// Manages subscribers and publishes snapshots to them.
pub struct SubscriptionManager {
    /// Active subscribers by ID, and the snapshot being delivered to them.
    registry: RwLock<Registry>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Manager whose subscribers start from `cart` until the first publish.
    pub fn with_snapshot(cart: Cart) -> Self {
        let manager = Self::new();
        manager.registry.write().current = Some(cart);
        manager
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Create a channel subscription.
    ///
    /// With `send_initial`, the first event is the last published snapshot.
    /// Registration and that read happen under the registry lock, so every
    /// later publish reaches the new subscriber.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = self.allocate_id();
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        let mut registry = self.registry.write();
        if config.send_initial {
            if let Some(cart) = &registry.current {
                let _ = sender.try_send(CartEvent::Snapshot(cart.clone()));
            }
        }
        registry.subscribers.insert(id, Subscriber::Channel(sender));

        SubscriptionHandle { id, receiver }
    }

    /// Register a callback invoked with each published snapshot.
    pub fn on_change(&self, callback: SnapshotCallback) -> SubscriptionId {
        let id = self.allocate_id();
        self.registry
            .write()
            .subscribers
            .insert(id, Subscriber::Callback(callback));
        id
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self.registry.write().subscribers.remove(&id);
        if let Some(sub) = removed {
            sub.notify_dropped(DropReason::Unsubscribed);
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.registry.read().subscribers.len()
    }

    /// Last published snapshot.
    pub fn current(&self) -> Option<Cart> {
        self.registry.read().current.clone()
    }

    /// Publish a snapshot to every subscriber. Drops channel subscribers that can't keep up.
    pub fn publish(&self, cart: &Cart) {
        let targets: Vec<(SubscriptionId, Subscriber)> = {
            let mut registry = self.registry.write();
            registry.current = Some(cart.clone());
            registry
                .subscribers
                .iter()
                .map(|(id, sub)| (*id, sub.clone()))
                .collect()
        };

        // Deliver outside the lock so callbacks may (un)subscribe.
        let to_remove: Vec<SubscriptionId> = targets
            .iter()
            .filter(|(_, sub)| !sub.deliver(cart))
            .map(|(id, _)| *id)
            .collect();

        if !to_remove.is_empty() {
            let mut registry = self.registry.write();
            for id in to_remove {
                if let Some(sub) = registry.subscribers.remove(&id) {
                    warn!(subscription = id.0, "Dropping slow cart subscriber");
                    sub.notify_dropped(DropReason::BufferOverflow);
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
