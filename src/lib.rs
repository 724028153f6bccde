//! # stationledger
//!
//! Per-user ledger engine for station record books: one generic
//! [`LedgerStore`] shared by the cashbook and gocard ledgers, plus a
//! [`BalanceNotifier`] that keeps entry-form balance previews fresh across
//! contexts.
//!
//! Every entry carries a date, a receipt amount, a payment amount, and a
//! derived running balance. The store recomputes every balance over the
//! user's full entry set after any mutation; see [`LedgerStore::recalculate`]
//! for the invariant and the accepted last-write-wins concurrency policy.

pub mod backup;
pub mod config;
pub mod document;
pub mod entry;
pub mod export;
pub mod gate;
pub mod identity;
pub mod kind;
pub mod notifier;
pub mod store;

pub use config::LedgerConfig;
pub use document::{DocPath, DocumentStore, MemoryStore, StoreError, WriteOp};
pub use entry::{EntryDraft, EntryFilter, EntryId, EntryPatch, EntrySort, LedgerEntry, ValidationError};
pub use gate::{DeleteGate, GateError};
pub use identity::{IdentityProvider, StaticIdentity, UserId};
pub use kind::LedgerKind;
pub use notifier::{BalanceNotifier, TokenBoard};
pub use store::{LedgerError, LedgerStore, LedgerSubscription};

/// Install a minimal `tracing` subscriber for embedding applications that
/// have not set one up themselves. Safe to call more than once.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::util::SubscriberInitExt;
    let _ = tracing_subscriber::registry().try_init();
}
