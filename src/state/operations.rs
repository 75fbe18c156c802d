//! Guarded amount transitions.
//!
//! Every transition is checked against the state it is applied to, so the
//! store can re-run it on the latest committed state after awaiting the stock
//! service. No transition leaves an entry with amount 0; only `Remove`
//! deletes one.

use crate::error::{CartError, Result};
use crate::types::{CartEntry, Product, ProductId, StockRecord};

use super::CartState;

/// An operation on the cart, carrying whatever external data it has so far.
#[derive(Clone, Debug)]
pub enum CartOperation {
    /// Add one unit, inserting the product if absent.
    Increment {
        product_id: ProductId,
        stock: StockRecord,
        product: Option<Product>,
    },

    /// Delete the entry.
    Remove { product_id: ProductId },

    /// Take one unit away, never below 1.
    Decrement { product_id: ProductId },

    /// Set the amount to `target`; increases need a stock record.
    SetAmount {
        product_id: ProductId,
        target: i64,
        stock: Option<StockRecord>,
    },
}

impl CartOperation {
    pub fn product_id(&self) -> ProductId {
        match self {
            CartOperation::Increment { product_id, .. }
            | CartOperation::Remove { product_id }
            | CartOperation::Decrement { product_id }
            | CartOperation::SetAmount { product_id, .. } => *product_id,
        }
    }

    /// Attach fetched product metadata. No effect on operations that don't insert.
    pub fn with_product(self, fetched: Product) -> Self {
        match self {
            CartOperation::Increment {
                product_id, stock, ..
            } => CartOperation::Increment {
                product_id,
                stock,
                product: Some(fetched),
            },
            other => other,
        }
    }

    /// Attach a fresh stock record.
    pub fn with_stock(self, fetched: StockRecord) -> Self {
        match self {
            CartOperation::Increment {
                product_id,
                product,
                ..
            } => CartOperation::Increment {
                product_id,
                stock: fetched,
                product,
            },
            CartOperation::SetAmount {
                product_id, target, ..
            } => CartOperation::SetAmount {
                product_id,
                target,
                stock: Some(fetched),
            },
            other => other,
        }
    }
}

/// Result of applying an operation.
#[derive(Debug)]
pub enum Step {
    /// The operation is valid; this is the next state.
    Commit(CartState),

    /// Product metadata is needed before the entry can be inserted.
    NeedsProduct(ProductId),

    /// A stock record is needed before the amount can be raised.
    NeedsStock(ProductId),
}

/// Apply an operation to a state, producing the next state.
///
/// The input state is left untouched.
pub fn apply_operation(state: &CartState, operation: CartOperation) -> Result<Step> {
    match operation {
        CartOperation::Increment {
            product_id,
            stock,
            product,
        } => {
            let current = state.amount_of(product_id).unwrap_or(0);
            let desired = current
                .checked_add(1)
                .ok_or(CartError::InvalidTransition {
                    product_id,
                    current: Some(current),
                    target: i64::from(current) + 1,
                })?;

            if !stock.admits(i64::from(desired)) {
                return Err(CartError::StockExceeded {
                    product_id,
                    requested: i64::from(desired),
                    available: stock.amount,
                });
            }

            let mut next = state.clone();
            match state.get(product_id) {
                Some(existing) => next.replace(existing.with_amount(desired)),
                None => {
                    let Some(product) = product else {
                        return Ok(Step::NeedsProduct(product_id));
                    };
                    if product.id != product_id {
                        return Err(CartError::MalformedResponse(format!(
                            "Requested product {} but metadata describes {}",
                            product_id, product.id
                        )));
                    }
                    next.push(CartEntry::from_product(product, desired));
                }
            }
            next.bump_revision();
            Ok(Step::Commit(next))
        }

        CartOperation::Remove { product_id } => {
            let mut next = state.clone();
            next.remove(product_id)
                .ok_or(CartError::EntryNotFound(product_id))?;
            next.bump_revision();
            Ok(Step::Commit(next))
        }

        CartOperation::Decrement { product_id } => {
            let existing = state
                .get(product_id)
                .ok_or(CartError::EntryNotFound(product_id))?;

            if existing.amount <= 1 {
                return Err(CartError::InvalidTransition {
                    product_id,
                    current: Some(existing.amount),
                    target: i64::from(existing.amount) - 1,
                });
            }

            let mut next = state.clone();
            next.replace(existing.with_amount(existing.amount - 1));
            next.bump_revision();
            Ok(Step::Commit(next))
        }

        CartOperation::SetAmount {
            product_id,
            target,
            stock,
        } => {
            let existing = state
                .get(product_id)
                .ok_or(CartError::EntryNotFound(product_id))?;
            let current = existing.amount;

            if target > i64::from(current) {
                let Some(stock) = stock else {
                    return Ok(Step::NeedsStock(product_id));
                };
                if !stock.admits(target) {
                    return Err(CartError::StockExceeded {
                        product_id,
                        requested: target,
                        available: stock.amount,
                    });
                }
            } else if target <= 0 {
                return Err(CartError::InvalidTransition {
                    product_id,
                    current: Some(current),
                    target,
                });
            }

            let amount = u32::try_from(target).map_err(|_| CartError::InvalidTransition {
                product_id,
                current: Some(current),
                target,
            })?;

            let mut next = state.clone();
            next.replace(existing.with_amount(amount));
            next.bump_revision();
            Ok(Step::Commit(next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Revision;

    fn state_with(entries: &[(u64, u32)]) -> CartState {
        CartState::from_entries(
            entries
                .iter()
                .map(|(id, amount)| CartEntry::from_product(Product::new(ProductId(*id)), *amount))
                .collect(),
        )
        .unwrap()
    }

    fn committed(step: Step) -> CartState {
        match step {
            Step::Commit(state) => state,
            other => panic!("Expected commit, got {:?}", other),
        }
    }

    fn stock(id: u64, amount: i64) -> StockRecord {
        StockRecord::new(ProductId(id), amount)
    }

    #[test]
    fn test_increment_existing() {
        let state = state_with(&[(1, 1)]);
        let op = CartOperation::Increment {
            product_id: ProductId(1),
            stock: stock(1, 2),
            product: None,
        };

        let next = committed(apply_operation(&state, op).unwrap());
        assert_eq!(next.amount_of(ProductId(1)), Some(2));
        assert_eq!(next.revision(), Revision(1));

        // Input untouched
        assert_eq!(state.amount_of(ProductId(1)), Some(1));
        assert_eq!(state.revision(), Revision(0));
    }

    #[test]
    fn test_increment_absent_needs_product() {
        let state = CartState::new();
        let op = CartOperation::Increment {
            product_id: ProductId(4),
            stock: stock(4, 3),
            product: None,
        };

        let step = apply_operation(&state, op).unwrap();
        assert!(matches!(step, Step::NeedsProduct(ProductId(4))));
    }

    #[test]
    fn test_increment_checks_stock_before_metadata() {
        let state = CartState::new();
        let op = CartOperation::Increment {
            product_id: ProductId(4),
            stock: stock(4, 0),
            product: None,
        };

        let err = apply_operation(&state, op).unwrap_err();
        assert!(matches!(
            err,
            CartError::StockExceeded {
                requested: 1,
                available: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_increment_inserts_with_metadata() {
        let state = state_with(&[(1, 1)]);
        let product = Product::new(ProductId(2)).with_attribute("title", "Boot");
        let op = CartOperation::Increment {
            product_id: ProductId(2),
            stock: stock(2, 1),
            product: Some(product),
        };

        let next = committed(apply_operation(&state, op).unwrap());
        let cart = next.snapshot();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.entries()[1].product_id, ProductId(2));
        assert_eq!(cart.entries()[1].amount, 1);
        assert_eq!(cart.entries()[1].attribute("title").unwrap(), "Boot");
    }

    #[test]
    fn test_increment_rejects_mismatched_metadata() {
        let state = CartState::new();
        let op = CartOperation::Increment {
            product_id: ProductId(2),
            stock: stock(2, 5),
            product: Some(Product::new(ProductId(3))),
        };

        let err = apply_operation(&state, op).unwrap_err();
        assert!(matches!(err, CartError::MalformedResponse(_)));
    }

    #[test]
    fn test_remove() {
        let state = state_with(&[(1, 3), (2, 1)]);

        let next = committed(
            apply_operation(&state, CartOperation::Remove { product_id: ProductId(1) }).unwrap(),
        );
        assert!(!next.contains(ProductId(1)));
        assert_eq!(next.len(), 1);

        let err = apply_operation(&next, CartOperation::Remove { product_id: ProductId(1) })
            .unwrap_err();
        assert!(matches!(err, CartError::EntryNotFound(ProductId(1))));
    }

    #[test]
    fn test_decrement_floor() {
        let state = state_with(&[(1, 1), (2, 3)]);

        let err = apply_operation(&state, CartOperation::Decrement { product_id: ProductId(1) })
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidTransition { .. }));

        let next = committed(
            apply_operation(&state, CartOperation::Decrement { product_id: ProductId(2) }).unwrap(),
        );
        assert_eq!(next.amount_of(ProductId(2)), Some(2));
    }

    #[test]
    fn test_decrement_absent() {
        let err = apply_operation(
            &CartState::new(),
            CartOperation::Decrement { product_id: ProductId(8) },
        )
        .unwrap_err();
        assert!(matches!(err, CartError::EntryNotFound(ProductId(8))));
    }

    #[test]
    fn test_set_amount_increase_needs_stock() {
        let state = state_with(&[(1, 2)]);
        let op = CartOperation::SetAmount {
            product_id: ProductId(1),
            target: 5,
            stock: None,
        };
        assert!(matches!(
            apply_operation(&state, op.clone()).unwrap(),
            Step::NeedsStock(ProductId(1))
        ));

        let next = committed(apply_operation(&state, op.with_stock(stock(1, 5))).unwrap());
        assert_eq!(next.amount_of(ProductId(1)), Some(5));
    }

    #[test]
    fn test_with_product_fills_increment_only() {
        let state = CartState::new();
        let op = CartOperation::Increment {
            product_id: ProductId(4),
            stock: stock(4, 3),
            product: None,
        }
        .with_product(Product::new(ProductId(4)));

        let next = committed(apply_operation(&state, op).unwrap());
        assert_eq!(next.amount_of(ProductId(4)), Some(1));

        let remove = CartOperation::Remove {
            product_id: ProductId(4),
        }
        .with_product(Product::new(ProductId(4)));
        assert!(matches!(remove, CartOperation::Remove { .. }));
    }

    #[test]
    fn test_set_amount_increase_bounded_by_stock() {
        let state = state_with(&[(1, 2)]);

        let err = apply_operation(
            &state,
            CartOperation::SetAmount {
                product_id: ProductId(1),
                target: 5,
                stock: Some(stock(1, 4)),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { requested: 5, available: 4, .. }));

        let next = committed(
            apply_operation(
                &state,
                CartOperation::SetAmount {
                    product_id: ProductId(1),
                    target: 5,
                    stock: Some(stock(1, 10)),
                },
            )
            .unwrap(),
        );
        assert_eq!(next.amount_of(ProductId(1)), Some(5));
    }

    #[test]
    fn test_set_amount_decrease_skips_stock() {
        let state = state_with(&[(1, 6)]);
        let next = committed(
            apply_operation(
                &state,
                CartOperation::SetAmount {
                    product_id: ProductId(1),
                    target: 2,
                    stock: None,
                },
            )
            .unwrap(),
        );
        assert_eq!(next.amount_of(ProductId(1)), Some(2));
    }

    #[test]
    fn test_set_amount_same_value_commits() {
        let state = state_with(&[(1, 3)]);
        let next = committed(
            apply_operation(
                &state,
                CartOperation::SetAmount {
                    product_id: ProductId(1),
                    target: 3,
                    stock: None,
                },
            )
            .unwrap(),
        );
        assert_eq!(next.amount_of(ProductId(1)), Some(3));
        assert_eq!(next.revision(), Revision(1));
    }

    #[test]
    fn test_set_amount_rejects_non_positive() {
        let state = state_with(&[(1, 3)]);
        for target in [0, -2] {
            let err = apply_operation(
                &state,
                CartOperation::SetAmount {
                    product_id: ProductId(1),
                    target,
                    stock: None,
                },
            )
            .unwrap_err();
            assert!(matches!(err, CartError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_set_amount_absent() {
        let err = apply_operation(
            &CartState::new(),
            CartOperation::SetAmount {
                product_id: ProductId(1),
                target: 1,
                stock: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CartError::EntryNotFound(ProductId(1))));
    }
}
