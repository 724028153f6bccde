//! Bulk-delete gate.
//!
//! Wiping a ledger is gated behind a user-chosen secret stored outside the
//! ledger subtree. Only a SHA-256 digest of the secret is ever persisted.
//! This is advisory client-side protection against fat-fingered bulk
//! deletes, not a security boundary.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::document::{DocPath, DocumentStore, StoreError};
use crate::identity::UserId;

/// Gate error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Chosen secret was shorter than the configured minimum
    SecretTooShort { minimum: usize },
    /// No gate secret has been set for this user
    NotConfigured,
    /// Supplied secret did not match the stored digest
    Mismatch,
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::SecretTooShort { minimum } => {
                write!(f, "Delete secret must be at least {} characters", minimum)
            }
            GateError::NotConfigured => {
                write!(f, "No delete secret has been set")
            }
            GateError::Mismatch => write!(f, "Delete secret does not match"),
        }
    }
}

impl std::error::Error for GateError {}

/// A stored gate: the hex SHA-256 digest of the user's chosen secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteGate {
    digest: String,
}

fn digest_hex(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl DeleteGate {
    /// Create a gate from a user-chosen secret.
    ///
    /// # Errors
    ///
    /// Returns `GateError::SecretTooShort` when the trimmed secret is
    /// shorter than `min_len`.
    pub fn new(secret: &str, min_len: usize) -> Result<Self, GateError> {
        if secret.trim().len() < min_len {
            return Err(GateError::SecretTooShort { minimum: min_len });
        }
        Ok(DeleteGate {
            digest: digest_hex(secret.trim()),
        })
    }

    /// Check a supplied secret against the stored digest.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Mismatch` when the digests differ.
    pub fn require(&self, attempt: &str) -> Result<(), GateError> {
        if digest_hex(attempt.trim()) == self.digest {
            Ok(())
        } else {
            Err(GateError::Mismatch)
        }
    }
}

fn gate_path(user: &UserId) -> DocPath {
    DocPath::root("settings").child(user.as_str()).child("delete_gate")
}

/// Persist a user's gate digest under `settings/<user>/delete_gate`.
pub fn save_gate<S: DocumentStore>(store: &S, user: &UserId, gate: &DeleteGate) -> Result<(), StoreError> {
    store.write(&gate_path(user), json!(gate.digest))
}

/// Load a user's gate, if one has been set.
pub fn load_gate<S: DocumentStore>(store: &S, user: &UserId) -> Result<Option<DeleteGate>, StoreError> {
    let value = store.read(&gate_path(user))?;
    Ok(value.and_then(|v| v.as_str().map(String::from)).map(|digest| DeleteGate { digest }))
}
