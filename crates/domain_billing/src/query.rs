//! Read-only projections of the ledger
//!
//! Dashboards, print previews and reports consume these; none of them carry
//! business logic beyond filtering and pagination.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, Money, PatientId, VisitId};

use crate::invoice::{DiscountType, Invoice, LineItem, PaymentStatus};
use crate::payment::Payment;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when none is given
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Invoice list filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    /// Case-insensitive match on invoice number, patient reference or notes
    pub search_text: Option<String>,
    pub status: Option<PaymentStatus>,
    /// Creation date (UTC)
    pub date: Option<NaiveDate>,
}

impl InvoiceFilter {
    pub fn by_status(status: PaymentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Search text trimmed, with blank text treated as absent
    pub fn search_term(&self) -> Option<&str> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether an invoice matches this filter
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(status) = self.status {
            if invoice.payment_status != status {
                return false;
            }
        }
        if let Some(date) = self.date {
            if invoice.created_at.date_naive() != date {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => {
                let term = term.to_lowercase();
                invoice.invoice_number().to_lowercase().contains(&term)
                    || invoice.patient_id.to_string().to_lowercase().contains(&term)
                    || invoice
                        .notes
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

/// A page request over the invoice list
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceQuery {
    pub filter: InvoiceFilter,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl InvoiceQuery {
    /// Clamps the page to at least 1 and the page size to 1..=100
    pub fn new(filter: InvoiceFilter, page: u32, page_size: u32) -> Self {
        Self {
            filter,
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One row of the invoice list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub patient_id: PatientId,
    pub visit_id: Option<VisitId>,
    pub discount_type: DiscountType,
    pub net_amount: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
    pub payment_status: PaymentStatus,
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
}

impl InvoiceSummary {
    pub fn from_invoice(invoice: &Invoice, item_count: u32) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number(),
            patient_id: invoice.patient_id,
            visit_id: invoice.visit_id,
            discount_type: invoice.discount_type,
            net_amount: invoice.net_amount,
            paid_amount: invoice.paid_amount,
            balance_due: invoice.balance_due(),
            payment_status: invoice.payment_status,
            item_count,
            created_at: invoice.created_at,
        }
    }
}

/// A page of invoice summaries, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePage {
    pub items: Vec<InvoiceSummary>,
    /// Total rows matching the filter across all pages
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Everything needed to print or preview an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    /// In line order
    pub line_items: Vec<LineItem>,
    /// Chronological
    pub payments: Vec<Payment>,
}

/// Billing totals over a creation-date range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingStatistics {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub invoice_count: u64,
    pub unpaid_count: u64,
    pub partial_count: u64,
    pub paid_count: u64,
    pub total_billed: Decimal,
    pub total_discounts: Decimal,
    pub total_collected: Decimal,
    pub outstanding: Decimal,
}

impl BillingStatistics {
    pub fn empty(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            ..Default::default()
        }
    }

    /// Folds one invoice into the totals
    pub fn record(&mut self, invoice: &Invoice) {
        self.invoice_count += 1;
        match invoice.payment_status {
            PaymentStatus::Unpaid => self.unpaid_count += 1,
            PaymentStatus::Partial => self.partial_count += 1,
            PaymentStatus::Paid => self.paid_count += 1,
        }
        self.total_billed += invoice.net_amount.amount();
        self.total_discounts += invoice.discount_amount.amount();
        self.total_collected += invoice.paid_amount.amount();
        self.outstanding += invoice.balance_due().amount();
    }
}
