//! Ledger kinds.
//!
//! The cashbook and the gocard account share one generic ledger engine;
//! a [`LedgerKind`] picks the document subtree the entries live under and
//! the notifier channel their refresh signals travel on.

use serde::{Deserialize, Serialize};

use crate::document::DocPath;

/// Which ledger a store instance operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Cashbook,
    GoCard,
}

impl LedgerKind {
    /// Every kind, in backup order.
    pub fn all() -> [LedgerKind; 2] {
        [LedgerKind::Cashbook, LedgerKind::GoCard]
    }

    /// Root of this ledger's document subtree.
    pub fn path(&self) -> DocPath {
        DocPath::root(self.key())
    }

    /// Stable key used for document paths and backup sections.
    pub fn key(&self) -> &'static str {
        match self {
            LedgerKind::Cashbook => "cashbook",
            LedgerKind::GoCard => "gocard",
        }
    }

    /// Notifier channel for balance-refresh signals of this ledger.
    pub fn channel(&self) -> &'static str {
        match self {
            LedgerKind::Cashbook => "cashbook-balance",
            LedgerKind::GoCard => "gocard-balance",
        }
    }
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
