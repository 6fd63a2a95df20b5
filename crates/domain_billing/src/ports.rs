//! Billing Ledger Store port
//!
//! The store is the only component with write access to monetary state.
//! Implementations must uphold two guarantees:
//!
//! - **Atomic writes**: an invoice and its lines, or a payment and the invoice
//!   update it causes, become visible together or not at all.
//! - **Per-invoice serialisation**: [`LedgerStore::commit_payment`] succeeds
//!   only if the invoice is still at `expected_version`; otherwise it returns
//!   [`BillingError::Conflict`] and writes nothing. Two settlements computed
//!   from the same snapshot can therefore never both land.
//!
//! Adapters:
//!
//! - `infra_db::adapters::PostgresLedgerStore` (PostgreSQL)
//! - [`crate::adapters::InMemoryLedgerStore`] (tests, local tooling)

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{DomainPort, HealthCheckable, InvoiceId};

use crate::error::BillingError;
use crate::invoice::{Invoice, NewInvoice};
use crate::payment::{NewPayment, Payment};
use crate::query::{BillingStatistics, InvoiceDetail, InvoicePage, InvoiceQuery};

#[async_trait]
pub trait LedgerStore: DomainPort + HealthCheckable {
    /// Persists an invoice header with all of its lines
    ///
    /// # Returns
    ///
    /// The stored header with its generated identifier
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, BillingError>;

    /// Reads the current invoice header, `None` if it does not exist
    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, BillingError>;

    /// Records a payment and advances the invoice in one unit of work
    ///
    /// # Errors
    ///
    /// - `Conflict` if the invoice moved past `payment.expected_version`
    /// - `NotFound` if the invoice does not exist
    async fn commit_payment(&self, payment: NewPayment) -> Result<Payment, BillingError>;

    /// Lists invoice summaries for a filter, newest first
    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<InvoicePage, BillingError>;

    /// Reads header, lines and payments of an invoice
    async fn get_invoice_detail(&self, id: InvoiceId) -> Result<Option<InvoiceDetail>, BillingError>;

    /// Aggregates invoices created between `from` and `to` inclusive
    async fn statistics(&self, from: NaiveDate, to: NaiveDate) -> Result<BillingStatistics, BillingError>;
}
