//! Ledger store.
//!
//! `LedgerStore` owns the `balance` field of every entry in one user's
//! ledger. The invariant it maintains: with the user's entries sorted by
//! `date` ascending (ties by `timestamp` ascending),
//! `balance[i] = balance[i-1] + receipt[i] - payment[i]` starting from
//! zero. The invariant is not kept incrementally: every mutation triggers
//! a full recompute over the user's entry set, which is O(n) reads plus
//! O(n) writes and is the deliberate correctness/simplicity tradeoff for
//! small per-user ledgers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::document::{DocPath, DocumentStore, StoreError, SubscriptionId, WriteOp};
use crate::entry::{
    lenient_amount, sort_chronological, sort_for_display, EntryDraft, EntryFilter, EntryId,
    EntryPatch, EntrySort, LedgerEntry, ValidationError,
};
use crate::gate::{DeleteGate, GateError};
use crate::identity::UserId;
use crate::kind::LedgerKind;

/// Ledger store error type
#[derive(Debug)]
pub enum LedgerError {
    /// A draft or patch failed validation; nothing was written
    Validation(ValidationError),
    /// A store operation failed before anything committed
    Store(StoreError),
    /// The entry does not exist in this user's ledger
    EntryNotFound(EntryId),
    /// The bulk-delete gate rejected the supplied secret
    Gate(GateError),
    /// Bulk delete found no entries owned by the user
    NothingToDelete,
    /// The triggering mutation committed, but the follow-up balance
    /// recalculation failed. The ledger is transiently inconsistent until
    /// `recalculate` is retried; the mutation is not rolled back.
    RecalculationFailed {
        committed: Option<EntryId>,
        source: StoreError,
    },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Validation(e) => write!(f, "Validation error: {}", e),
            LedgerError::Store(e) => write!(f, "Store error: {}", e),
            LedgerError::EntryNotFound(id) => write!(f, "Entry not found: {}", id),
            LedgerError::Gate(e) => write!(f, "Delete gate: {}", e),
            LedgerError::NothingToDelete => write!(f, "Ledger has no entries to delete"),
            LedgerError::RecalculationFailed { committed, source } => match committed {
                Some(id) => write!(
                    f,
                    "Entry {} committed but balance recalculation failed (retry recalculate): {}",
                    id, source
                ),
                None => write!(
                    f,
                    "Mutation committed but balance recalculation failed (retry recalculate): {}",
                    source
                ),
            },
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Validation(err)
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::Store(err)
    }
}

impl From<GateError> for LedgerError {
    fn from(err: GateError) -> Self {
        LedgerError::Gate(err)
    }
}

/// Wire form of an entry. The document key is the entry id, so the stored
/// document does not repeat it.
#[derive(Debug, Serialize, Deserialize)]
struct EntryDoc {
    date: NaiveDate,
    particulars: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voucher: Option<String>,
    receipt: Decimal,
    payment: Decimal,
    balance: Decimal,
    created_by: UserId,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl EntryDoc {
    fn from_entry(entry: &LedgerEntry) -> Self {
        EntryDoc {
            date: entry.date,
            particulars: entry.particulars.clone(),
            voucher: entry.voucher.clone(),
            receipt: entry.receipt,
            payment: entry.payment,
            balance: entry.balance,
            created_by: entry.created_by.clone(),
            timestamp: entry.timestamp,
            updated_at: entry.updated_at,
        }
    }

    fn into_entry(self, id: EntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            date: self.date,
            particulars: self.particulars,
            voucher: self.voucher,
            receipt: self.receipt,
            payment: self.payment,
            balance: self.balance,
            created_by: self.created_by,
            timestamp: self.timestamp,
            updated_at: self.updated_at,
        }
    }
}

fn decode_entry(root: &DocPath, id: &str, value: JsonValue) -> Result<LedgerEntry, StoreError> {
    let doc: EntryDoc = serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        path: root.child(id).as_str().to_string(),
        message: e.to_string(),
    })?;
    Ok(doc.into_entry(id.to_string()))
}

fn encode_entry(entry: &LedgerEntry) -> Result<JsonValue, StoreError> {
    serde_json::to_value(EntryDoc::from_entry(entry)).map_err(|e| StoreError::Other(e.to_string()))
}

/// Handle keeping one live ledger subscription alive.
///
/// Dropping the handle cancels the subscription.
pub struct LedgerSubscription<S: DocumentStore> {
    store: Arc<S>,
    id: SubscriptionId,
}

impl<S: DocumentStore> LedgerSubscription<S> {
    /// Cancel explicitly. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl<S: DocumentStore> Drop for LedgerSubscription<S> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.id);
    }
}

/// One user-partitioned ledger over a document backend.
///
/// The store is parameterized by [`LedgerKind`], which picks the document
/// subtree; cashbook and gocard share this engine. Cloning is cheap and
/// clones share the backend.
pub struct LedgerStore<S: DocumentStore> {
    store: Arc<S>,
    kind: LedgerKind,
}

impl<S: DocumentStore> Clone for LedgerStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            kind: self.kind,
        }
    }
}

impl<S: DocumentStore> LedgerStore<S> {
    pub fn new(store: Arc<S>, kind: LedgerKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    fn root(&self) -> DocPath {
        self.kind.path()
    }

    /// Read the user's entries, chronologically ordered.
    ///
    /// The `created_by` filter is applied here, before any display filter;
    /// a missing per-user filter would leak entries across users.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Store` when the backend read fails or a stored
    /// document cannot be decoded.
    pub fn entries_for(&self, user: &UserId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let root = self.root();
        let children = self.store.read_children(&root)?;
        let mut entries = Vec::with_capacity(children.len());
        for (id, value) in children {
            let entry = decode_entry(&root, &id, value)?;
            if &entry.created_by == user {
                entries.push(entry);
            }
        }
        sort_chronological(&mut entries);
        Ok(entries)
    }

    /// Subscribe to the user's entries as a live, push-based sequence.
    ///
    /// The callback receives the current view immediately, then again after
    /// every mutation of this ledger's subtree, until the returned handle is
    /// dropped. Entries are filtered to `user`, then display-filtered, then
    /// sorted per `sort`. Documents that fail to decode are skipped with a
    /// warning rather than poisoning the whole view.
    pub fn subscribe<F>(
        &self,
        user: &UserId,
        sort: EntrySort,
        filter: EntryFilter,
        callback: F,
    ) -> LedgerSubscription<S>
    where
        F: Fn(Vec<LedgerEntry>) + Send + Sync + 'static,
    {
        let root = self.root();
        let user = user.clone();
        let cb_root = root.clone();
        let id = self.store.subscribe(
            &root,
            Arc::new(move |children: &BTreeMap<String, JsonValue>| {
                let mut entries = Vec::with_capacity(children.len());
                for (id, value) in children {
                    match decode_entry(&cb_root, id, value.clone()) {
                        Ok(entry) => {
                            if entry.created_by == user && filter.matches(&entry) {
                                entries.push(entry);
                            }
                        }
                        Err(e) => log::warn!("Skipping undecodable ledger document: {}", e),
                    }
                }
                sort_for_display(&mut entries, sort);
                callback(entries);
            }),
        );
        LedgerSubscription {
            store: self.store.clone(),
            id,
        }
    }

    /// Preview the balance a new entry would receive if inserted at the
    /// chronological end of the ledger.
    ///
    /// Pending amounts arrive as raw form text; blank or non-numeric input
    /// counts as zero. The result is advisory; the authoritative balance
    /// is assigned by [`LedgerStore::recalculate`].
    pub fn preview_balance(
        &self,
        user: &UserId,
        pending_receipt: &str,
        pending_payment: &str,
    ) -> Result<Decimal, LedgerError> {
        let last = self.last_balance(user)?;
        Ok(last + lenient_amount(pending_receipt) - lenient_amount(pending_payment))
    }

    fn last_balance(&self, user: &UserId) -> Result<Decimal, LedgerError> {
        let entries = self.entries_for(user)?;
        Ok(entries.last().map(|e| e.balance).unwrap_or(Decimal::ZERO))
    }

    /// Insert a validated draft and recalculate the user's ledger.
    ///
    /// The entry is seeded with a preview balance so it is plausible even
    /// before the recalculation pass lands; the pass then rewrites every
    /// balance in chronological order, which matters when the draft's date
    /// is not the latest in the ledger.
    ///
    /// # Errors
    ///
    /// `LedgerError::Validation` before any write;
    /// `LedgerError::RecalculationFailed` (carrying the committed id) when
    /// the insert landed but the recalculation batch did not.
    pub fn insert(&self, user: &UserId, draft: EntryDraft) -> Result<EntryId, LedgerError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("ledger_insert", kind = %self.kind).entered();

        draft.validate()?;
        let date = draft.date.ok_or(ValidationError::MissingField("date"))?;

        let seed_balance = self.last_balance(user)? + draft.receipt - draft.payment;
        let entry = LedgerEntry {
            id: EntryId::new(), // replaced by the generated document key
            date,
            particulars: draft.particulars,
            voucher: draft.voucher,
            receipt: draft.receipt,
            payment: draft.payment,
            balance: seed_balance,
            created_by: user.clone(),
            timestamp: Utc::now(),
            updated_at: None,
        };

        let id = self.store.push(&self.root(), encode_entry(&entry)?)?;
        log::info!("Inserted {} entry {} for {}", self.kind, id, user);

        self.recalculate(user).map_err(|e| retag_recalc(e, Some(id.clone())))?;
        Ok(id)
    }

    /// Apply a patch to one of the user's entries and recalculate.
    ///
    /// Recalculation runs on every effective patch: a date or amount change
    /// can reorder or re-value the whole downstream sequence. An empty patch
    /// is a no-op; nothing is written and `updated_at` is not stamped.
    ///
    /// # Errors
    ///
    /// `LedgerError::EntryNotFound` when the id is absent from this user's
    /// ledger (entries owned by other users read as not found).
    pub fn update(&self, user: &UserId, id: &str, patch: &EntryPatch) -> Result<(), LedgerError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("ledger_update", kind = %self.kind).entered();

        let mut entry = self.owned_entry(user, id)?;
        if patch.is_empty() {
            return Ok(());
        }
        patch.apply(&mut entry, Utc::now())?;
        self.store.write(&self.root().child(id), encode_entry(&entry)?)?;
        log::info!("Updated {} entry {} for {}", self.kind, id, user);

        self.recalculate(user)
            .map_err(|e| retag_recalc(e, Some(id.to_string())))
    }

    /// Delete one of the user's entries and recalculate the remainder.
    pub fn delete(&self, user: &UserId, id: &str) -> Result<(), LedgerError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("ledger_delete", kind = %self.kind).entered();

        self.owned_entry(user, id)?;
        self.store.delete(&self.root().child(id))?;
        log::info!("Deleted {} entry {} for {}", self.kind, id, user);

        self.recalculate(user).map_err(|e| retag_recalc(e, None))
    }

    /// Delete every entry the user owns, gated by the bulk-delete secret.
    ///
    /// Returns the number of entries removed. Other users' entries are
    /// untouched; the user's set is empty afterwards, so no recalculation
    /// pass is needed.
    ///
    /// # Errors
    ///
    /// `LedgerError::Gate` when the secret does not match;
    /// `LedgerError::NothingToDelete` when the user owns no entries.
    pub fn delete_all(
        &self,
        user: &UserId,
        gate: &DeleteGate,
        secret: &str,
    ) -> Result<usize, LedgerError> {
        gate.require(secret)?;

        let entries = self.entries_for(user)?;
        if entries.is_empty() {
            return Err(LedgerError::NothingToDelete);
        }

        let root = self.root();
        let ops = entries
            .iter()
            .map(|entry| WriteOp::remove(root.child(&entry.id)))
            .collect();
        self.store.write_batch(ops)?;
        log::info!(
            "Deleted all {} {} entries for {}",
            entries.len(),
            self.kind,
            user
        );
        Ok(entries.len())
    }

    /// Recompute and rewrite every balance in the user's ledger.
    ///
    /// Entries are sorted by `date` ascending (ties by `timestamp`
    /// ascending) and walked accumulating from zero; every entry's
    /// `balance` field is written back in one batched update. The batch is
    /// not transactional in the strict sense: a partial failure leaves the
    /// ledger inconsistent and the call should simply be retried. Two
    /// clients recalculating the same ledger at nearly the same time race,
    /// and the later batch wins: accepted last-write-wins policy, by
    /// specification of the target deployment.
    pub fn recalculate(&self, user: &UserId) -> Result<(), LedgerError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("ledger_recalculate", kind = %self.kind).entered();

        let entries = self.entries_for(user)?;
        if entries.is_empty() {
            log::debug!("No {} entries for {}; nothing to recalculate", self.kind, user);
            return Ok(());
        }

        let root = self.root();
        let mut running = Decimal::ZERO;
        let mut ops = Vec::with_capacity(entries.len());
        for entry in &entries {
            running += entry.net();
            let value = serde_json::to_value(running).map_err(|e| StoreError::Other(e.to_string()))?;
            ops.push(WriteOp::set(root.child(&entry.id).child("balance"), value));
        }
        self.store.write_batch(ops)?;
        log::debug!(
            "Recalculated {} {} balances for {}",
            entries.len(),
            self.kind,
            user
        );
        Ok(())
    }
}

impl<S: DocumentStore> LedgerStore<S> {
    fn owned_entry(&self, user: &UserId, id: &str) -> Result<LedgerEntry, LedgerError> {
        let root = self.root();
        let value = self
            .store
            .read(&root.child(id))?
            .ok_or_else(|| LedgerError::EntryNotFound(id.to_string()))?;
        let entry = decode_entry(&root, id, value)?;
        // Foreign entries read as not-found so one user's API surface never
        // confirms another user's data.
        if &entry.created_by != user {
            return Err(LedgerError::EntryNotFound(id.to_string()));
        }
        Ok(entry)
    }
}

fn retag_recalc(err: LedgerError, committed: Option<EntryId>) -> LedgerError {
    match err {
        LedgerError::Store(source) => LedgerError::RecalculationFailed { committed, source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryStore;
    use std::sync::Mutex;

    fn store() -> LedgerStore<MemoryStore> {
        LedgerStore::new(Arc::new(MemoryStore::new()), LedgerKind::Cashbook)
    }

    fn draft(date: &str, receipt: i64, payment: i64) -> EntryDraft {
        EntryDraft {
            date: Some(date.parse().unwrap()),
            particulars: "entry".to_string(),
            voucher: None,
            receipt: Decimal::from(receipt),
            payment: Decimal::from(payment),
        }
    }

    fn balances(ledger: &LedgerStore<MemoryStore>, user: &UserId) -> Vec<Decimal> {
        ledger
            .entries_for(user)
            .unwrap()
            .iter()
            .map(|e| e.balance)
            .collect()
    }

    fn decs<const N: usize>(values: [i64; N]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_running_balance_invariant_after_mutations() {
        let ledger = store();
        let user = UserId::from("u1");
        ledger.insert(&user, draft("2024-01-01", 100, 0)).unwrap();
        ledger.insert(&user, draft("2024-01-02", 0, 30)).unwrap();
        ledger.insert(&user, draft("2024-01-03", 50, 20)).unwrap();

        let entries = ledger.entries_for(&user).unwrap();
        let mut running = Decimal::ZERO;
        for entry in &entries {
            running += entry.receipt - entry.payment;
            assert_eq!(entry.balance, running);
        }
    }

    #[test]
    fn test_out_of_order_insert_rewrites_downstream_balances() {
        let ledger = store();
        let user = UserId::from("u1");
        ledger.insert(&user, draft("2024-01-01", 100, 0)).unwrap();
        ledger.insert(&user, draft("2024-01-03", 0, 40)).unwrap();
        assert_eq!(balances(&ledger, &user), decs([100, 60]));

        // Backdated entry lands in the middle; the 01-03 balance moves.
        ledger.insert(&user, draft("2024-01-02", 20, 0)).unwrap();
        assert_eq!(balances(&ledger, &user), decs([100, 120, 80]));
    }

    #[test]
    fn test_delete_restores_two_entry_result() {
        let ledger = store();
        let user = UserId::from("u1");
        ledger.insert(&user, draft("2024-01-01", 100, 0)).unwrap();
        ledger.insert(&user, draft("2024-01-03", 0, 40)).unwrap();
        let middle = ledger.insert(&user, draft("2024-01-02", 20, 0)).unwrap();
        assert_eq!(balances(&ledger, &user), decs([100, 120, 80]));

        ledger.delete(&user, &middle).unwrap();
        assert_eq!(balances(&ledger, &user), decs([100, 60]));
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let ledger = store();
        let user = UserId::from("u1");
        ledger.insert(&user, draft("2024-01-01", 10, 0)).unwrap();
        ledger.insert(&user, draft("2024-01-02", 0, 3)).unwrap();

        let first = balances(&ledger, &user);
        ledger.recalculate(&user).unwrap();
        assert_eq!(balances(&ledger, &user), first);
    }

    #[test]
    fn test_users_are_isolated() {
        let ledger = store();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        ledger.insert(&alice, draft("2024-01-01", 100, 0)).unwrap();
        ledger.insert(&bob, draft("2024-01-01", 7, 0)).unwrap();

        assert_eq!(balances(&ledger, &alice), decs([100]));
        assert_eq!(balances(&ledger, &bob), decs([7]));
        assert_eq!(
            ledger.preview_balance(&alice, "0", "0").unwrap(),
            Decimal::from(100)
        );
    }

    #[test]
    fn test_preview_balance_leniency() {
        let ledger = store();
        let user = UserId::from("u1");
        assert_eq!(
            ledger.preview_balance(&user, "", "").unwrap(),
            Decimal::ZERO
        );

        ledger.insert(&user, draft("2024-01-01", 100, 0)).unwrap();
        assert_eq!(
            ledger.preview_balance(&user, "25", "10").unwrap(),
            Decimal::from(115)
        );
        assert_eq!(
            ledger.preview_balance(&user, "oops", "10").unwrap(),
            Decimal::from(90)
        );
    }

    #[test]
    fn test_update_reorders_and_revalues() {
        let ledger = store();
        let user = UserId::from("u1");
        let first = ledger.insert(&user, draft("2024-01-01", 100, 0)).unwrap();
        ledger.insert(&user, draft("2024-01-02", 0, 40)).unwrap();

        // Move the receipt after the payment; the payment now goes negative
        // first and the receipt closes at 60.
        let patch = EntryPatch {
            date: Some("2024-01-05".parse().unwrap()),
            ..Default::default()
        };
        ledger.update(&user, &first, &patch).unwrap();
        assert_eq!(balances(&ledger, &user), decs([-40, 60]));

        let entries = ledger.entries_for(&user).unwrap();
        assert!(entries[1].updated_at.is_some());
    }

    #[test]
    fn test_empty_patch_is_a_no_op() {
        let ledger = store();
        let user = UserId::from("u1");
        let id = ledger.insert(&user, draft("2024-01-01", 100, 0)).unwrap();

        ledger.update(&user, &id, &EntryPatch::default()).unwrap();

        let entries = ledger.entries_for(&user).unwrap();
        assert_eq!(entries[0].updated_at, None);
        assert_eq!(balances(&ledger, &user), decs([100]));
    }

    #[test]
    fn test_foreign_entry_reads_as_not_found() {
        let ledger = store();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let id = ledger.insert(&alice, draft("2024-01-01", 5, 0)).unwrap();

        let err = ledger.delete(&bob, &id).unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotFound(_)));
        let err = ledger.update(&bob, &id, &EntryPatch::default()).unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotFound(_)));
        // Alice's ledger is untouched.
        assert_eq!(balances(&ledger, &alice), decs([5]));
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let ledger = store();
        let user = UserId::from("u1");
        let bad = EntryDraft {
            particulars: "no date".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ledger.insert(&user, bad).unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(ledger.entries_for(&user).unwrap().is_empty());
    }

    #[test]
    fn test_delete_all_gate_and_count() {
        let ledger = store();
        let user = UserId::from("u1");
        let gate = DeleteGate::new("wipe-key", 4).unwrap();

        assert!(matches!(
            ledger.delete_all(&user, &gate, "wrong").unwrap_err(),
            LedgerError::Gate(GateError::Mismatch)
        ));

        assert!(matches!(
            ledger.delete_all(&user, &gate, "wipe-key").unwrap_err(),
            LedgerError::NothingToDelete
        ));

        ledger.insert(&user, draft("2024-01-01", 1, 0)).unwrap();
        ledger.insert(&user, draft("2024-01-02", 2, 0)).unwrap();
        let other = UserId::from("u2");
        ledger.insert(&other, draft("2024-01-01", 9, 0)).unwrap();

        assert_eq!(ledger.delete_all(&user, &gate, "wipe-key").unwrap(), 2);
        assert!(ledger.entries_for(&user).unwrap().is_empty());
        assert_eq!(balances(&ledger, &other), decs([9]));
    }

    #[test]
    fn test_recalculation_failure_reports_committed_id() {
        let backend = Arc::new(MemoryStore::new());
        let ledger = LedgerStore::new(backend.clone(), LedgerKind::GoCard);
        let user = UserId::from("u1");

        // The insert lands, the recalculation batch does not. The error
        // names the committed entry; the entry stays; a retried
        // recalculate makes the ledger consistent again.
        backend.fail_next_batch();
        let err = ledger.insert(&user, draft("2024-01-01", 10, 0)).unwrap_err();
        let committed = match err {
            LedgerError::RecalculationFailed {
                committed: Some(id),
                ..
            } => id,
            other => panic!("expected RecalculationFailed, got {other}"),
        };
        assert_eq!(ledger.entries_for(&user).unwrap()[0].id, committed);

        ledger.recalculate(&user).unwrap();
        assert_eq!(balances(&ledger, &user), decs([10]));
    }

    #[test]
    fn test_subscription_is_filtered_and_live() {
        let ledger = store();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        ledger.insert(&bob, draft("2024-01-01", 1, 0)).unwrap();

        let views: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = views.clone();
        let sub = ledger.subscribe(
            &alice,
            EntrySort::OldestEntry,
            EntryFilter::default(),
            move |entries| {
                sink.lock()
                    .unwrap()
                    .push(entries.iter().map(|e| e.particulars.clone()).collect());
            },
        );

        // Initial view is empty: bob's entry never shows for alice.
        assert_eq!(views.lock().unwrap().last().unwrap().len(), 0);

        let mut d = draft("2024-01-02", 5, 0);
        d.particulars = "alice entry".to_string();
        ledger.insert(&alice, d).unwrap();

        let latest = views.lock().unwrap().last().unwrap().clone();
        assert_eq!(latest, vec!["alice entry".to_string()]);

        sub.cancel();
        ledger.insert(&alice, draft("2024-01-03", 5, 0)).unwrap();
        let after_cancel = views.lock().unwrap().len();
        ledger.insert(&alice, draft("2024-01-04", 5, 0)).unwrap();
        assert_eq!(views.lock().unwrap().len(), after_cancel);
    }
}
