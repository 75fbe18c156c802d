//! Cart blob encoding.

use crate::error::Result;
use crate::types::CartEntry;

/// Serialize entries as a JSON array.
pub fn encode_cart(entries: &[CartEntry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

/// Parse a JSON array of entries.
///
/// Only the format is checked here; cart invariants are checked when the
/// entries are loaded into a `CartState`.
pub fn decode_cart(text: &str) -> Result<Vec<CartEntry>> {
    Ok(serde_json::from_str(text)?)
}
