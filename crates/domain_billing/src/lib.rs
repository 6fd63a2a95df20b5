//! Billing Domain - Clinic Billing Ledger
//!
//! This crate owns every piece of monetary state in the clinic system:
//! invoices, their price-locked line items, and the payments applied to them.
//!
//! # Components
//!
//! - **Invoice Builder** ([`invoice`]): re-prices every requested line from the
//!   service catalog, applies the concession discount and produces an invoice
//!   ready to persist atomically.
//! - **Payment Processor** ([`payment`]): settles tendered cash against the
//!   outstanding balance, separating the amount applied from change given.
//! - **Receipt Issuer** ([`receipt`]): derives a unique receipt number per
//!   payment event.
//! - **Ledger Store** ([`ports::LedgerStore`]): the durable record, with an
//!   optimistic version check guarding each invoice's paid amount.
//!
//! # Payment status
//!
//! ```text
//! unpaid --[payment, paid < net]--> partial
//! unpaid --[payment, paid >= net - ε]--> paid
//! partial --[payment, paid < net]--> partial
//! partial --[payment, paid >= net - ε]--> paid
//! paid --[any payment]--> rejected
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingService, CreateInvoiceRequest, ApplyPaymentRequest};
//!
//! let service = BillingService::new(store, catalog, BillingPolicy::default());
//! let invoice_id = service.create_invoice(&actor, request).await?;
//! let outcome = service.apply_payment(&actor, ApplyPaymentRequest::cash(invoice_id, dec!(400))).await?;
//! println!("receipt {} change {}", outcome.receipt_number, outcome.change_amount);
//! ```

pub mod policy;
pub mod catalog;
pub mod invoice;
pub mod payment;
pub mod receipt;
pub mod query;
pub mod ports;
pub mod service;
pub mod adapters;
pub mod error;

pub use policy::BillingPolicy;
pub use catalog::{CatalogItem, CatalogPort};
pub use invoice::{
    DiscountType, Invoice, InvoiceTotals, LineItem, NewInvoice, PaymentStatus, MAX_AMOUNT, MAX_QUANTITY,
};
pub use payment::{NewPayment, Payment, PaymentMethod, Settlement};
pub use receipt::{issue_receipt, ReceiptNumber};
pub use query::{
    BillingStatistics, InvoiceDetail, InvoiceFilter, InvoicePage, InvoiceQuery, InvoiceSummary,
};
pub use ports::LedgerStore;
pub use service::{
    ApplyPaymentRequest, BillingService, CreateInvoiceRequest, ItemRequest, PaymentOutcome,
    RetryPolicy,
};
pub use error::BillingError;
