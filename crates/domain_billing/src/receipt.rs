//! Receipt numbering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::InvoiceId;

/// A receipt number, unique per payment event
///
/// Format: `RCP-<YYYYMMDD>-<invoice, 6 digits>-<payment sequence, 2 digits>`.
/// The sequence distinguishes two payments on the same invoice and day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptNumber(String);

impl ReceiptNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues the receipt number for the `sequence`-th payment on an invoice
pub fn issue_receipt(invoice_id: InvoiceId, sequence: i32, issued_at: DateTime<Utc>) -> ReceiptNumber {
    ReceiptNumber(format!(
        "RCP-{}-{:06}-{:02}",
        issued_at.format("%Y%m%d"),
        invoice_id.value(),
        sequence
    ))
}
