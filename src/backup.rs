//! Backup/restore boundary.
//!
//! A backup is one portable JSON document holding every ledger subtree,
//! keyed by ledger kind. Restore is an opaque bulk copy: each subtree is
//! replaced wholesale, balances included, in a single batched write per
//! kind. The balance algorithm is not involved: a restored ledger is
//! exactly what was snapshotted.

use serde_json::{Map, Value as JsonValue};

use crate::document::{DocumentStore, StoreError, WriteOp};
use crate::kind::LedgerKind;

/// Backup error type
#[derive(Debug)]
pub enum BackupError {
    /// Underlying store failure
    Store(StoreError),
    /// The backup document is not in the expected shape
    Malformed(String),
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::Store(e) => write!(f, "Store error: {}", e),
            BackupError::Malformed(msg) => write!(f, "Malformed backup document: {}", msg),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<StoreError> for BackupError {
    fn from(err: StoreError) -> Self {
        BackupError::Store(err)
    }
}

/// What a restore touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Total entries written across all ledger subtrees.
    pub entries: usize,
}

/// Snapshot every ledger subtree into one JSON document.
pub fn snapshot<S: DocumentStore>(store: &S) -> Result<JsonValue, BackupError> {
    let mut document = Map::new();
    for kind in LedgerKind::all() {
        let children = store.read_children(&kind.path())?;
        document.insert(kind.key().to_string(), JsonValue::Object(children.into_iter().collect()));
    }
    Ok(JsonValue::Object(document))
}

/// Replace every ledger subtree with the contents of `backup`.
///
/// Kinds absent from the backup are cleared, matching the snapshot of an
/// empty ledger. Each subtree is replaced in one atomic batch (remove the
/// old subtree, write every entry).
///
/// # Errors
///
/// Returns `BackupError::Malformed` when the document's top level or a
/// kind section is not a JSON object; nothing is written in that case.
pub fn restore<S: DocumentStore>(store: &S, backup: &JsonValue) -> Result<RestoreSummary, BackupError> {
    let top = backup
        .as_object()
        .ok_or_else(|| BackupError::Malformed("top level is not an object".to_string()))?;

    // Validate shape fully before the first write.
    for kind in LedgerKind::all() {
        if let Some(section) = top.get(kind.key()) {
            if !section.is_object() {
                return Err(BackupError::Malformed(format!(
                    "section {} is not an object",
                    kind.key()
                )));
            }
        }
    }

    let mut entries = 0;
    for kind in LedgerKind::all() {
        let root = kind.path();
        let mut ops = vec![WriteOp::remove(root.clone())];
        if let Some(section) = top.get(kind.key()).and_then(JsonValue::as_object) {
            for (id, doc) in section {
                ops.push(WriteOp::set(root.child(id), doc.clone()));
            }
            entries += section.len();
        }
        store.write_batch(ops)?;
    }
    log::info!("Restored {} ledger entries from backup", entries);
    Ok(RestoreSummary { entries })
}
