//! Spreadsheet export boundary.
//!
//! Consumes the ledger store's filtered/sorted output and writes one row
//! per entry under a header row. Formatting beyond that is the caller's
//! concern.

use std::io::Write;

use crate::entry::LedgerEntry;

/// Export error type
#[derive(Debug)]
pub enum ExportError {
    /// CSV serialization or I/O failure
    Csv(csv::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Csv(e) => write!(f, "CSV export error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err)
    }
}

const HEADER: [&str; 6] = [
    "Date",
    "Particulars",
    "Voucher",
    "Receipt",
    "Payment",
    "Balance",
];

/// Write `entries` as CSV: a header row, then one row per entry in the
/// order given.
///
/// # Errors
///
/// Returns `ExportError::Csv` on any serialization or I/O failure.
pub fn export_csv<W: Write>(entries: &[LedgerEntry], writer: W) -> Result<(), ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADER)?;
    for entry in entries {
        out.write_record([
            entry.date.to_string(),
            entry.particulars.clone(),
            entry.voucher.clone().unwrap_or_default(),
            entry.receipt.to_string(),
            entry.payment.to_string(),
            entry.balance.to_string(),
        ])?;
    }
    out.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn entry() -> LedgerEntry {
        LedgerEntry {
            id: "e1".to_string(),
            date: "2024-01-02".parse().unwrap(),
            particulars: "Fuel, diesel".to_string(),
            voucher: Some("V-9".to_string()),
            receipt: Decimal::ZERO,
            payment: Decimal::new(4250, 2),
            balance: Decimal::new(5750, 2),
            created_by: UserId::from("u1"),
            timestamp: Utc.timestamp_opt(10, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn test_header_and_row() {
        let mut buf = Vec::new();
        export_csv(&[entry()], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Particulars,Voucher,Receipt,Payment,Balance"
        );
        // The comma in the particulars is quoted, not a field break.
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-02,\"Fuel, diesel\",V-9,0,42.50,57.50"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let mut buf = Vec::new();
        export_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
