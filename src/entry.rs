//! Ledger entry model, draft validation, and display ordering.
//!
//! A [`LedgerEntry`] is the persisted form of one dated line in a user's
//! ledger. Drafts ([`EntryDraft`]) are what forms submit; patches
//! ([`EntryPatch`]) are what table-side edits apply. The `balance` field is
//! derived; only the ledger store writes it (see `store::LedgerStore`).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Opaque entry identifier, generated by the document store on insert.
pub type EntryId = String;

/// One persisted line of a user's ledger.
///
/// Entries are partitioned per user: every read path filters on
/// `created_by` before anything else. `balance` is derived and always
/// recomputed over the full per-user set after any mutation; the value a
/// form seeds at insert time is advisory and is superseded by the
/// recalculation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub particulars: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher: Option<String>,
    pub receipt: Decimal,
    pub payment: Decimal,
    pub balance: Decimal,
    pub created_by: UserId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Net effect of this entry on the running balance.
    pub fn net(&self) -> Decimal {
        self.receipt - self.payment
    }
}

/// Validation error for drafts and patches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was blank or absent
    MissingField(&'static str),
    /// An amount could not be parsed as a decimal
    NotANumber { field: &'static str, raw: String },
    /// An amount was negative
    NegativeAmount { field: &'static str, value: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField(field) => {
                write!(f, "Required field missing: {}", field)
            }
            ValidationError::NotANumber { field, raw } => {
                write!(f, "Field {} is not a number: {:?}", field, raw)
            }
            ValidationError::NegativeAmount { field, value } => {
                write!(f, "Field {} must not be negative: {}", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// What an entry form submits. Validated before any write is attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: Option<NaiveDate>,
    pub particulars: String,
    #[serde(default)]
    pub voucher: Option<String>,
    pub receipt: Decimal,
    pub payment: Decimal,
}

impl EntryDraft {
    /// Check required fields and amount signs.
    ///
    /// Reports the first failure; nothing is written when this errs.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when `date` is absent, `particulars` is
    /// blank, or either amount is negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.date.is_none() {
            return Err(ValidationError::MissingField("date"));
        }
        if self.particulars.trim().is_empty() {
            return Err(ValidationError::MissingField("particulars"));
        }
        for (field, value) in [("receipt", self.receipt), ("payment", self.payment)] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(ValidationError::NegativeAmount {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A table-side edit: only the set fields change.
///
/// Date and amount changes can reorder or re-value the chronological
/// sequence, so the store recalculates unconditionally after applying one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    pub date: Option<NaiveDate>,
    pub particulars: Option<String>,
    pub voucher: Option<String>,
    pub receipt: Option<Decimal>,
    pub payment: Option<Decimal>,
}

impl EntryPatch {
    /// Apply the set fields to `entry` and stamp `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when a patched amount is negative or a
    /// patched `particulars` is blank.
    pub fn apply(&self, entry: &mut LedgerEntry, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(particulars) = &self.particulars {
            if particulars.trim().is_empty() {
                return Err(ValidationError::MissingField("particulars"));
            }
        }
        for (field, value) in [("receipt", self.receipt), ("payment", self.payment)] {
            if let Some(value) = value {
                if value.is_sign_negative() && !value.is_zero() {
                    return Err(ValidationError::NegativeAmount {
                        field,
                        value: value.to_string(),
                    });
                }
            }
        }

        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(particulars) = &self.particulars {
            entry.particulars = particulars.clone();
        }
        if let Some(voucher) = &self.voucher {
            entry.voucher = Some(voucher.clone());
        }
        if let Some(receipt) = self.receipt {
            entry.receipt = receipt;
        }
        if let Some(payment) = self.payment {
            entry.payment = payment;
        }
        entry.updated_at = Some(now);
        Ok(())
    }

    /// True when no field is set. The store treats such a patch as a no-op,
    /// skipping the write and the recalculation pass.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.particulars.is_none()
            && self.voucher.is_none()
            && self.receipt.is_none()
            && self.payment.is_none()
    }
}

/// Display sort order for subscriptions.
///
/// Balance computation always uses chronological order regardless of the
/// display sort; see [`sort_chronological`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntrySort {
    /// Newest `timestamp` first
    #[default]
    RecentEntry,
    /// Oldest `timestamp` first
    OldestEntry,
    /// Most recently edited first (`updated_at` falling back to `timestamp`)
    RecentEdit,
}

/// Sort entries for display.
pub fn sort_for_display(entries: &mut [LedgerEntry], sort: EntrySort) {
    match sort {
        EntrySort::RecentEntry => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        EntrySort::OldestEntry => entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        EntrySort::RecentEdit => entries.sort_by(|a, b| {
            let a_edit = a.updated_at.unwrap_or(a.timestamp);
            let b_edit = b.updated_at.unwrap_or(b.timestamp);
            b_edit.cmp(&a_edit)
        }),
    }
}

/// Sort entries into balance-computation order: `date` ascending, ties
/// broken by `timestamp` ascending.
pub fn sort_chronological(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.timestamp.cmp(&b.timestamp)));
}

/// Display-level filter, applied after the mandatory per-user filter.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Case-insensitive substring match on `particulars` and `voucher`
    pub search: Option<String>,
    /// Keep entries dated on or after this date
    pub date_from: Option<NaiveDate>,
    /// Keep entries dated within this calendar year
    pub year: Option<i32>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_particulars = entry.particulars.to_lowercase().contains(&needle);
            let in_voucher = entry
                .voucher
                .as_deref()
                .map(|v| v.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_particulars && !in_voucher {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if entry.date < from {
                return false;
            }
        }
        if let Some(year) = self.year {
            use chrono::Datelike;
            if entry.date.year() != year {
                return false;
            }
        }
        true
    }
}

/// Parse a form-supplied pending amount leniently: blank or non-numeric
/// input counts as zero. Preview-only; drafts go through strict
/// validation instead.
pub fn lenient_amount(raw: &str) -> Decimal {
    raw.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO)
}
