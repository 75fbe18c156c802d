//! User-facing failure notices.
//!
//! The store never surfaces a failure only through its return value: each
//! rejected mutation is also reported to a [`Notifier`] exactly once.

use crate::error::CartError;
use crate::types::ProductId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four categories of failure the cart reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Requested amount is above the available stock.
    StockExceeded,
    /// Adding a product failed for any other reason.
    AddFailed,
    /// Removing a product failed.
    RemoveFailed,
    /// Changing a product's amount failed.
    AmountChangeFailed,
}

impl NoticeKind {
    /// Default user-facing message.
    pub fn message(self) -> &'static str {
        match self {
            NoticeKind::StockExceeded => "Requested quantity is out of stock",
            NoticeKind::AddFailed => "Could not add the product",
            NoticeKind::RemoveFailed => "Could not remove the product",
            NoticeKind::AmountChangeFailed => "Could not change the product quantity",
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A single failure notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub product_id: ProductId,
}

impl Notice {
    pub fn new(kind: NoticeKind, product_id: ProductId) -> Self {
        Self { kind, product_id }
    }

    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

/// Which mutation path a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MutationPath {
    Add,
    Remove,
    Decrement,
    UpdateAmount,
}

impl MutationPath {
    /// Category reported for an error raised on this path.
    pub(crate) fn notice_kind(self, error: &CartError) -> NoticeKind {
        match (self, error) {
            (MutationPath::Add | MutationPath::UpdateAmount, CartError::StockExceeded { .. }) => {
                NoticeKind::StockExceeded
            }
            (MutationPath::Add, _) => NoticeKind::AddFailed,
            (MutationPath::Remove, _) => NoticeKind::RemoveFailed,
            (MutationPath::Decrement | MutationPath::UpdateAmount, _) => {
                NoticeKind::AmountChangeFailed
            }
        }
    }
}

/// Sink for user-facing failure notices.
///
/// Fire-and-forget: implementations must not block and cannot fail.
pub trait Notifier: Send + Sync {
    fn error(&self, notice: Notice);
}

/// Logs notices as `tracing` warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, notice: Notice) {
        tracing::warn!(
            kind = ?notice.kind,
            product_id = notice.product_id.0,
            "{}",
            notice.message()
        );
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Kinds of all notices received so far.
    pub fn kinds(&self) -> Vec<NoticeKind> {
        self.notices.lock().iter().map(|n| n.kind).collect()
    }

    /// Remove and return all notices.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
