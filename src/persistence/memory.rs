//! In-memory durable store.

use super::DurableStore;
use crate::error::{CartError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Slot table held in memory.
///
/// Writes can be made to fail to exercise the persistence-failure path.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    slots: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot (builder style).
    pub fn with_slot(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.write().insert(key.into(), value.into());
        self
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw contents of a slot.
    pub fn slot(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned()
    }
}

impl DurableStore for MemoryDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CartError::Persistence(format!("Write to {} rejected", key)));
        }
        self.slots.write().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
