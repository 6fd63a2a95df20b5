//! Invoice construction
//!
//! An invoice is built once from catalog-priced lines and is afterwards only
//! touched by payment settlement. Line prices are copied from the catalog at
//! creation time and never change again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{Currency, InvoiceId, Money, PatientId, Rate, ServiceItemId, UserId, VisitId};

use crate::catalog::CatalogItem;
use crate::error::BillingError;
use crate::payment::NewPayment;
use crate::policy::BillingPolicy;

/// Longest free-text note accepted on an invoice or payment
pub const MAX_NOTES_LEN: usize = 1000;

/// Largest quantity accepted on a single line
pub const MAX_QUANTITY: u32 = 10_000;

/// Largest amount a stored money column can hold (NUMERIC(12,2))
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Concession category that determines the invoice discount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// No discount
    #[default]
    None,
    /// Senior citizen
    Senior,
    /// Person with disability
    Pwd,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::None => "none",
            DiscountType::Senior => "senior",
            DiscountType::Pwd => "pwd",
        }
    }

    /// The discount rate this category earns under the given policy
    pub fn rate(&self, policy: &BillingPolicy) -> Rate {
        match self {
            DiscountType::None => Rate::zero(),
            DiscountType::Senior | DiscountType::Pwd => policy.concession_rate,
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(DiscountType::None),
            "senior" => Ok(DiscountType::Senior),
            "pwd" => Ok(DiscountType::Pwd),
            other => Err(BillingError::validation(format!("unknown discount type '{}'", other))),
        }
    }
}

/// Settlement progress of an invoice
///
/// Always derived from the paid and net amounts, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status from the amounts
    ///
    /// - unpaid: nothing paid (within tolerance)
    /// - paid: paid amount reaches the net amount less the tolerance
    /// - partial: anything in between
    pub fn derive(paid: &Money, net: &Money, tolerance: Decimal) -> Self {
        let paid = paid.amount();
        if paid.abs() < tolerance {
            PaymentStatus::Unpaid
        } else if paid >= net.amount() - tolerance {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }

    /// Paid is terminal
    pub fn accepts_payments(&self) -> bool {
        !matches!(self, PaymentStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(BillingError::validation(format!("unknown payment status '{}'", other))),
        }
    }
}

/// A price-locked service line on an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// 1-based position in the order the lines were requested
    pub line_no: u32,
    pub service_item_id: ServiceItemId,
    /// Catalog name at the time of invoicing
    pub description: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

impl LineItem {
    /// Prices a line from the catalog entry
    pub fn priced(line_no: u32, item: &CatalogItem, quantity: u32) -> Result<Self, BillingError> {
        if quantity == 0 {
            return Err(BillingError::validation("quantity must be at least 1"));
        }
        if quantity > MAX_QUANTITY {
            return Err(BillingError::validation(format!(
                "quantity {} exceeds the maximum of {}",
                quantity, MAX_QUANTITY
            )));
        }
        let subtotal = item.unit_price.checked_times(quantity)?;
        ensure_storable(&subtotal)?;

        Ok(Self {
            line_no,
            service_item_id: item.id,
            description: item.name.clone(),
            unit_price: item.unit_price,
            quantity,
            subtotal,
        })
    }
}

/// Monetary totals of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of the line subtotals
    pub total_amount: Money,
    pub discount_amount: Money,
    /// Amount actually owed
    pub net_amount: Money,
}

impl InvoiceTotals {
    /// Computes totals for the lines under the discount category
    ///
    /// The discount is rounded to the currency's minor unit; the net amount is
    /// then exactly `total - discount`.
    pub fn compute(
        lines: &[LineItem],
        discount_type: DiscountType,
        policy: &BillingPolicy,
    ) -> Result<Self, BillingError> {
        let mut total = Money::zero(policy.currency);
        for line in lines {
            total = total.checked_add(&line.subtotal)?;
        }

        let discount = discount_type.rate(policy).apply(&total).round_to_currency();
        let net = total.checked_sub(&discount)?;

        Ok(Self {
            total_amount: total,
            discount_amount: discount,
            net_amount: net,
        })
    }
}

fn ensure_storable(amount: &Money) -> Result<(), BillingError> {
    if amount.amount() > MAX_AMOUNT {
        return Err(BillingError::validation(format!(
            "amount {} exceeds the maximum of {}",
            amount, MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Validated header fields of an invoice about to be built
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceHeader {
    pub patient_id: PatientId,
    pub visit_id: Option<VisitId>,
    pub discount_type: DiscountType,
    pub notes: Option<String>,
    pub created_by: UserId,
}

impl InvoiceHeader {
    /// Checks the caller-supplied header before any catalog lookup happens
    pub fn validate(
        patient_id: Option<PatientId>,
        visit_id: Option<VisitId>,
        discount_type: DiscountType,
        notes: Option<String>,
        created_by: UserId,
        policy: &BillingPolicy,
    ) -> Result<Self, BillingError> {
        let patient_id = patient_id.ok_or_else(|| BillingError::validation("missing patient"))?;
        if policy.require_visit && visit_id.is_none() {
            return Err(BillingError::validation("missing visit"));
        }

        Ok(Self {
            patient_id,
            visit_id,
            discount_type,
            notes: normalize_notes(notes)?,
            created_by,
        })
    }
}

/// Trims notes and rejects oversize text; blank notes become `None`
pub fn normalize_notes(notes: Option<String>) -> Result<Option<String>, BillingError> {
    match notes.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => Ok(None),
        Some(n) if n.chars().count() > MAX_NOTES_LEN => Err(BillingError::validation(format!(
            "notes exceed {} characters",
            MAX_NOTES_LEN
        ))),
        other => Ok(other),
    }
}

/// An invoice ready to be persisted with all of its lines
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub patient_id: PatientId,
    pub visit_id: Option<VisitId>,
    pub currency: Currency,
    pub discount_type: DiscountType,
    pub lines: Vec<LineItem>,
    pub totals: InvoiceTotals,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewInvoice {
    /// Assembles the invoice from the header and the surviving priced lines
    ///
    /// # Errors
    ///
    /// - `Validation("no items")` if no line survived catalog filtering
    /// - `Validation("nothing to bill")` if the lines add up to zero
    /// - `Validation` if the total is too large to store
    pub fn assemble(
        header: InvoiceHeader,
        lines: Vec<LineItem>,
        policy: &BillingPolicy,
    ) -> Result<Self, BillingError> {
        if lines.is_empty() {
            return Err(BillingError::validation("no items"));
        }

        let totals = InvoiceTotals::compute(&lines, header.discount_type, policy)?;
        if totals.total_amount.is_zero() {
            return Err(BillingError::validation("nothing to bill"));
        }
        ensure_storable(&totals.total_amount)?;

        Ok(Self {
            patient_id: header.patient_id,
            visit_id: header.visit_id,
            currency: policy.currency,
            discount_type: header.discount_type,
            lines,
            totals,
            notes: header.notes,
            created_by: header.created_by,
            created_at: Utc::now(),
        })
    }
}

/// A persisted invoice header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub patient_id: PatientId,
    pub visit_id: Option<VisitId>,
    pub currency: Currency,
    pub discount_type: DiscountType,
    pub total_amount: Money,
    pub discount_amount: Money,
    pub net_amount: Money,
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    /// Number of payments recorded so far
    pub payment_count: i32,
    /// Optimistic concurrency token, bumped on every settlement
    pub version: i32,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The header as it exists right after creation
    pub fn from_new(id: InvoiceId, new: &NewInvoice) -> Self {
        Self {
            id,
            patient_id: new.patient_id,
            visit_id: new.visit_id,
            currency: new.currency,
            discount_type: new.discount_type,
            total_amount: new.totals.total_amount,
            discount_amount: new.totals.discount_amount,
            net_amount: new.totals.net_amount,
            paid_amount: Money::zero(new.currency),
            payment_status: PaymentStatus::Unpaid,
            payment_count: 0,
            version: 0,
            notes: new.notes.clone(),
            created_by: new.created_by,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// Human-readable invoice number (`INV-000042`)
    pub fn invoice_number(&self) -> String {
        self.id.to_string()
    }

    /// Outstanding balance; header amounts always share the invoice currency
    pub fn balance_due(&self) -> Money {
        Money::new(self.net_amount.amount() - self.paid_amount.amount(), self.currency)
    }

    pub fn ensure_payable(&self) -> Result<(), BillingError> {
        if !self.payment_status.accepts_payments() {
            return Err(BillingError::invalid_state(format!(
                "invoice {} is already paid",
                self.id
            )));
        }
        Ok(())
    }

    /// Applies a committed payment to the header
    pub fn apply(&mut self, payment: &NewPayment) {
        self.paid_amount = payment.settlement.new_paid_amount;
        self.payment_status = payment.settlement.new_status;
        self.payment_count = payment.sequence;
        self.version += 1;
        self.updated_at = payment.paid_at;
    }

    /// Checks the monetary invariants of the header
    pub fn is_consistent(&self, tolerance: Decimal) -> bool {
        let net_matches = self.total_amount.amount() - self.discount_amount.amount()
            == self.net_amount.amount();
        let status_matches =
            PaymentStatus::derive(&self.paid_amount, &self.net_amount, tolerance) == self.payment_status;
        let not_overpaid = self.paid_amount.amount() <= self.net_amount.amount() + tolerance;

        net_matches && status_matches && not_overpaid && !self.paid_amount.is_negative()
    }
}
