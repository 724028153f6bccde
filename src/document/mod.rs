//! Document store boundary.
//!
//! The ledger store runs against any hierarchical document backend that can
//! do live subtree subscriptions, point reads, append-with-generated-id
//! inserts, per-path deletes, and atomic multi-path batched writes. This
//! module defines that seam as the [`DocumentStore`] trait; the shipped
//! implementation is [`MemoryStore`].
//!
//! Paths are slash-joined segment lists. A ledger lives under one root
//! segment per ledger kind (`cashbook/<id>`, `gocard/<id>`), and a batched
//! balance rewrite targets field-level paths (`cashbook/<id>/balance`).

pub mod memory;

#[doc(inline)]
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

/// Slash-joined path into the document tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// Path rooted at a single segment.
    pub fn root(segment: &str) -> Self {
        DocPath(segment.to_string())
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Self {
        DocPath(format!("{}/{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document store error type
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Backend could not be reached
    Unreachable(String),
    /// The caller is not permitted to touch this path
    PermissionDenied(String),
    /// A stored document could not be decoded
    Corrupt { path: String, message: String },
    /// Other store errors
    Other(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unreachable(msg) => write!(f, "Store unreachable: {}", msg),
            StoreError::PermissionDenied(path) => {
                write!(f, "Permission denied: {}", path)
            }
            StoreError::Corrupt { path, message } => {
                write!(f, "Corrupt document at {}: {}", path, message)
            }
            StoreError::Other(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// One write in an atomic batch. `value: None` deletes the path.
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub path: DocPath,
    pub value: Option<JsonValue>,
}

impl WriteOp {
    pub fn set(path: DocPath, value: JsonValue) -> Self {
        WriteOp {
            path,
            value: Some(value),
        }
    }

    pub fn remove(path: DocPath) -> Self {
        WriteOp { path, value: None }
    }
}

/// Callback delivering the current children of a subscribed subtree.
pub type SubtreeCallback = Arc<dyn Fn(&BTreeMap<String, JsonValue>) + Send + Sync>;

/// Handle identifying one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Trait for hierarchical document backends.
///
/// Implementations must deliver subscription callbacks synchronously with
/// respect to the mutating call on the same connection (read-after-write),
/// and must apply [`DocumentStore::write_batch`] atomically: either every
/// op lands or none do.
pub trait DocumentStore: Send + Sync {
    /// Read the value at `path`, or `None` when the path is absent.
    fn read(&self, path: &DocPath) -> Result<Option<JsonValue>, StoreError>;

    /// Read the immediate children of `path` as a key → value map.
    ///
    /// An absent path reads as an empty map.
    fn read_children(&self, path: &DocPath) -> Result<BTreeMap<String, JsonValue>, StoreError>;

    /// Append `value` under `path` with a generated key; returns the key.
    fn push(&self, path: &DocPath, value: JsonValue) -> Result<String, StoreError>;

    /// Overwrite the value at `path`, creating intermediate nodes.
    fn write(&self, path: &DocPath, value: JsonValue) -> Result<(), StoreError>;

    /// Apply every op atomically.
    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Remove the subtree at `path`. Absent paths are a no-op.
    fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Subscribe to changes under `path`. The callback fires once with the
    /// current children at registration, then after every mutation touching
    /// the subtree, until [`DocumentStore::unsubscribe`] is called.
    fn subscribe(&self, path: &DocPath, callback: SubtreeCallback) -> SubscriptionId;

    /// Cancel a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_path_child_and_segments() {
        let path = DocPath::root("cashbook").child("abc").child("balance");
        assert_eq!(path.as_str(), "cashbook/abc/balance");
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, ["cashbook", "abc", "balance"]);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Corrupt {
            path: "cashbook/x".to_string(),
            message: "bad date".to_string(),
        };
        assert!(err.to_string().contains("cashbook/x"));
        assert!(err.to_string().contains("bad date"));
    }
}
