//! Cart state and its amount transitions.
//!
//! The state is a keyed map (product id -> entry) plus insertion order, so the
//! unique-product invariant holds by construction. Transitions are pure:
//! they take a state and return the next one without touching the input.

mod entries;
mod operations;

pub use entries::CartState;
pub use operations::{apply_operation, CartOperation, Step};
