//! Keyed cart state.

use crate::error::{CartError, Result};
use crate::types::{Cart, CartEntry, ProductId, Revision};
use std::collections::HashMap;

/// Committed cart contents keyed by product, with insertion order kept separately.
///
/// `entries` and `order` always hold the same set of product ids.
#[derive(Clone, Debug, Default)]
pub struct CartState {
    entries: HashMap<ProductId, CartEntry>,
    order: Vec<ProductId>,
    revision: Revision,
}

impl CartState {
    /// Empty state at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build state from an ordered list of entries (e.g. a rehydrated cart).
    ///
    /// Rejects duplicate product ids and zero amounts.
    pub fn from_entries(entries: Vec<CartEntry>) -> Result<Self> {
        let mut state = Self::new();
        for entry in entries {
            if entry.amount == 0 {
                return Err(CartError::Corruption(format!(
                    "Entry for product {} has amount 0",
                    entry.product_id
                )));
            }
            if state.contains(entry.product_id) {
                return Err(CartError::Corruption(format!(
                    "Duplicate entry for product {}",
                    entry.product_id
                )));
            }
            state.push(entry);
        }
        Ok(state)
    }

    pub fn get(&self, product_id: ProductId) -> Option<&CartEntry> {
        self.entries.get(&product_id)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.contains_key(&product_id)
    }

    /// Amount held for a product, `None` when absent.
    pub fn amount_of(&self, product_id: ProductId) -> Option<u32> {
        self.entries.get(&product_id).map(|e| e.amount)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Project to an ordered, immutable snapshot.
    pub fn snapshot(&self) -> Cart {
        let entries = self
            .order
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect();
        Cart::new(entries, self.revision)
    }

    // --- Mutation (crate-internal; callers go through apply_operation) ---

    pub(crate) fn push(&mut self, entry: CartEntry) {
        let id = entry.product_id;
        if self.entries.insert(id, entry).is_none() {
            self.order.push(id);
        }
    }

    pub(crate) fn replace(&mut self, entry: CartEntry) {
        if let Some(slot) = self.entries.get_mut(&entry.product_id) {
            *slot = entry;
        }
    }

    pub(crate) fn remove(&mut self, product_id: ProductId) -> Option<CartEntry> {
        let removed = self.entries.remove(&product_id)?;
        self.order.retain(|id| *id != product_id);
        Some(removed)
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision = self.revision.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;

    fn entry(id: u64, amount: u32) -> CartEntry {
        CartEntry::from_product(Product::new(ProductId(id)), amount)
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let mut state = CartState::new();
        state.push(entry(5, 1));
        state.push(entry(2, 1));
        state.push(entry(9, 1));

        let ids: Vec<u64> = state.snapshot().iter().map(|e| e.product_id.0).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[test]
    fn test_remove_keeps_remaining_order() {
        let mut state = CartState::new();
        state.push(entry(1, 1));
        state.push(entry(2, 1));
        state.push(entry(3, 1));

        assert!(state.remove(ProductId(2)).is_some());
        assert!(state.remove(ProductId(2)).is_none());

        let ids: Vec<u64> = state.snapshot().iter().map(|e| e.product_id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let result = CartState::from_entries(vec![entry(1, 1), entry(1, 2)]);
        assert!(matches!(result, Err(CartError::Corruption(_))));
    }

    #[test]
    fn test_from_entries_rejects_zero_amount() {
        let result = CartState::from_entries(vec![entry(1, 0)]);
        assert!(matches!(result, Err(CartError::Corruption(_))));
    }

    #[test]
    fn test_replace_ignores_absent() {
        let mut state = CartState::new();
        state.replace(entry(4, 2));
        assert!(state.is_empty());
    }
}
