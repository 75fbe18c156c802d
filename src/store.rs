//! Main CartStore struct tying all components together.

use crate::error::{CartError, Result};
use crate::notify::{MutationPath, Notice, Notifier};
use crate::persistence::{decode_cart, encode_cart, DurableStore, DEFAULT_CART_KEY};
use crate::state::{apply_operation, CartOperation, CartState, Step};
use crate::stock::StockService;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager};
use crate::types::{AmountUpdate, Cart, ProductId, Revision};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Cart store configuration.
#[derive(Clone, Debug)]
pub struct CartConfig {
    /// Durable store slot holding the cart.
    pub storage_key: String,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_CART_KEY.to_string(),
        }
    }
}

/// Outcome of one commit attempt.
enum Attempt {
    Done(Cart),
    NeedsProduct(ProductId),
    NeedsStock(ProductId),
}

/// The shopping cart.
///
/// Owns the committed cart state and provides:
/// - stock-validated mutations (add, remove, decrement, set amount)
/// - snapshot publication to subscribers
/// - persistence of every committed snapshot
///
/// Every rejected mutation is reported to the [`Notifier`] and also returned
/// as an `Err`; the committed cart is unchanged in that case.
pub struct CartStore {
    config: CartConfig,

    stock: Arc<dyn StockService>,

    notifier: Arc<dyn Notifier>,

    durable: Arc<dyn DurableStore>,

    /// Committed state. Never held across an `.await`, nor while callbacks run.
    state: Mutex<CartState>,

    /// Committed snapshots not yet published and persisted, oldest first.
    pending: Mutex<VecDeque<Cart>>,

    /// Held by the one thread draining `pending`.
    publish_lock: Mutex<()>,

    /// Revision of the last snapshot written to durable storage.
    persisted: Mutex<Option<Revision>>,

    subscriptions: SubscriptionManager,

    /// Set when the last persisted snapshot is behind the in-memory one.
    dirty: AtomicBool,
}

impl CartStore {
    /// Create the store, rehydrating the cart from durable storage.
    ///
    /// A missing, unreadable or invalid stored cart yields an empty cart.
    pub fn open(
        config: CartConfig,
        stock: Arc<dyn StockService>,
        notifier: Arc<dyn Notifier>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        let state = match Self::load_state(&config.storage_key, durable.as_ref()) {
            Ok(Some(state)) => {
                info!(entries = state.len(), key = %config.storage_key, "Rehydrated cart");
                state
            }
            Ok(None) => CartState::new(),
            Err(e) => {
                warn!(error = %e, key = %config.storage_key, "Stored cart unusable, starting empty");
                CartState::new()
            }
        };

        Self {
            config,
            stock,
            notifier,
            durable,
            subscriptions: SubscriptionManager::with_snapshot(state.snapshot()),
            state: Mutex::new(state),
            pending: Mutex::new(VecDeque::new()),
            publish_lock: Mutex::new(()),
            persisted: Mutex::new(None),
            dirty: AtomicBool::new(false),
        }
    }

    fn load_state(key: &str, durable: &dyn DurableStore) -> Result<Option<CartState>> {
        let Some(text) = durable.get(key)? else {
            return Ok(None);
        };
        let entries = decode_cart(&text)?;
        CartState::from_entries(entries).map(Some)
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    // --- Read Surface ---

    /// Current committed snapshot.
    pub fn cart(&self) -> Cart {
        self.state.lock().snapshot()
    }

    /// Subscribe to committed snapshots over a channel.
    ///
    /// With `send_initial`, the first event is the latest published snapshot
    /// and every later commit follows it in order.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    /// Register a callback run with every committed snapshot.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Cart) + Send + Sync + 'static,
    {
        self.subscriptions.on_change(Arc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    /// Whether the last commit failed to reach durable storage.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Write the current snapshot to durable storage.
    ///
    /// Safe to call from an `on_change` callback.
    pub fn flush(&self) -> Result<()> {
        let mut persisted = self.persisted.lock();
        let cart = self.cart();
        self.write(&cart)?;
        *persisted = Some(cart.revision());
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    // --- Mutations ---

    /// Add one unit of a product, inserting it if absent.
    #[instrument(skip(self), fields(product_id = product_id.0))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<Cart> {
        let result = self.try_add(product_id).await;
        self.settle(MutationPath::Add, product_id, result)
    }

    async fn try_add(&self, product_id: ProductId) -> Result<Cart> {
        let stock = self.stock.get_stock(product_id).await?;
        self.run(CartOperation::Increment {
            product_id,
            stock,
            product: None,
        })
        .await
    }

    /// Remove a product's entry.
    #[instrument(skip(self), fields(product_id = product_id.0))]
    pub fn remove_product(&self, product_id: ProductId) -> Result<Cart> {
        let result = self.commit_local(CartOperation::Remove { product_id });
        self.settle(MutationPath::Remove, product_id, result)
    }

    /// Take one unit away from a product with more than one unit.
    ///
    /// `update.amount` is ignored; the stored amount drives the decrement.
    #[instrument(skip(self), fields(product_id = update.product_id.0))]
    pub fn decrement_product(&self, update: AmountUpdate) -> Result<Cart> {
        let product_id = update.product_id;
        let result = self.commit_local(CartOperation::Decrement { product_id });
        self.settle(MutationPath::Decrement, product_id, result)
    }

    /// Set a product's amount, checking stock only when raising it.
    #[instrument(skip(self), fields(product_id = update.product_id.0, target = update.amount))]
    pub async fn update_product_amount(&self, update: AmountUpdate) -> Result<Cart> {
        let product_id = update.product_id;
        let result = self
            .run(CartOperation::SetAmount {
                product_id,
                target: update.amount,
                stock: None,
            })
            .await;
        self.settle(MutationPath::UpdateAmount, product_id, result)
    }

    // --- Commit Machinery ---

    /// Apply an operation, fetching whatever external data it asks for.
    ///
    /// Each attempt is validated against the latest committed state, so a
    /// commit that lands while this one awaits the stock service is not lost.
    async fn run(&self, mut operation: CartOperation) -> Result<Cart> {
        loop {
            match self.commit(operation.clone())? {
                Attempt::Done(cart) => return Ok(cart),
                Attempt::NeedsProduct(id) => {
                    let product = self.stock.get_product(id).await?;
                    operation = operation.with_product(product);
                }
                Attempt::NeedsStock(id) => {
                    let stock = self.stock.get_stock(id).await?;
                    operation = operation.with_stock(stock);
                }
            }
        }
    }

    /// Commit an operation that never needs the stock service.
    fn commit_local(&self, operation: CartOperation) -> Result<Cart> {
        let product_id = operation.product_id();
        match self.commit(operation)? {
            Attempt::Done(cart) => Ok(cart),
            Attempt::NeedsProduct(_) | Attempt::NeedsStock(_) => Err(CartError::InvalidTransition {
                product_id,
                current: None,
                target: 0,
            }),
        }
    }

    /// Validate and apply against the committed state, then publish and persist.
    fn commit(&self, operation: CartOperation) -> Result<Attempt> {
        let cart = {
            let mut state = self.state.lock();
            let cart = match apply_operation(&state, operation)? {
                Step::Commit(next) => {
                    *state = next;
                    state.snapshot()
                }
                Step::NeedsProduct(id) => return Ok(Attempt::NeedsProduct(id)),
                Step::NeedsStock(id) => return Ok(Attempt::NeedsStock(id)),
            };
            // Queued under the state lock so the queue stays in revision order.
            self.pending.lock().push_back(cart.clone());
            cart
        };

        self.drain_pending();
        Ok(Attempt::Done(cart))
    }

    /// Publish then persist queued snapshots, oldest first.
    ///
    /// One thread drains at a time and holds no cart lock while callbacks run.
    /// A commit made from inside a callback queues its snapshot and returns;
    /// the drain already in progress delivers it next.
    fn drain_pending(&self) {
        loop {
            let Some(publishing) = self.publish_lock.try_lock() else {
                return;
            };
            loop {
                let next = self.pending.lock().pop_front();
                let Some(cart) = next else {
                    break;
                };
                self.subscriptions.publish(&cart);
                self.persist(&cart);
            }
            drop(publishing);

            // A snapshot queued between the last pop and the unlock is ours to deliver.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    /// Write a committed snapshot. Failures leave the store dirty; the in-memory
    /// state stays committed and the next commit or `flush` writes it again.
    fn persist(&self, cart: &Cart) {
        let mut persisted = self.persisted.lock();
        if matches!(*persisted, Some(revision) if cart.revision() < revision) {
            // A flush already wrote something newer.
            return;
        }

        match self.write(cart) {
            Ok(()) => {
                *persisted = Some(cart.revision());
                self.dirty.store(false, Ordering::SeqCst);
            }
            Err(e) => {
                error!(
                    error = %e,
                    revision = cart.revision().0,
                    "Failed to persist cart; storage is behind memory"
                );
                self.dirty.store(true, Ordering::SeqCst);
            }
        }
    }

    fn write(&self, cart: &Cart) -> Result<()> {
        let text = encode_cart(cart.entries())?;
        self.durable.set(&self.config.storage_key, &text)
    }

    /// Report a failed mutation to the notifier; pass the result through.
    fn settle(&self, path: MutationPath, product_id: ProductId, result: Result<Cart>) -> Result<Cart> {
        match &result {
            Ok(cart) => debug!(
                revision = cart.revision().0,
                amount = cart.amount_of(product_id),
                "Cart committed"
            ),
            Err(e) => {
                let kind = path.notice_kind(e);
                debug!(?kind, error = %e, "Cart mutation rejected");
                self.notifier.error(Notice::new(kind, product_id));
            }
        }
        result
    }
}
