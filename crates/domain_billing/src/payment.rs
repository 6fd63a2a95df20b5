//! Payment settlement
//!
//! Cash handed over at the counter may exceed what is owed. The ledger only
//! ever posts the part that settles the outstanding balance; the excess is
//! returned as change and never touches the invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{InvoiceId, Money, PaymentId, UserId};

use crate::error::BillingError;
use crate::invoice::{Invoice, PaymentStatus};
use crate::policy::BillingPolicy;
use crate::receipt::{issue_receipt, ReceiptNumber};

/// Tender type accepted at the cashier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Check,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Check => "check",
        }
    }

    /// Only cash tender can exceed the balance and be answered with change
    pub fn gives_change(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "check" => Ok(PaymentMethod::Check),
            other => Err(BillingError::validation(format!("unknown payment method '{}'", other))),
        }
    }
}

/// The outcome of settling tendered money against an invoice snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Money handed over by the payer
    pub amount_tendered: Money,
    /// Part of the tender posted to the invoice
    pub amount_applied: Money,
    /// Excess returned to the payer
    pub change_amount: Money,
    pub new_paid_amount: Money,
    pub new_status: PaymentStatus,
    /// Balance still owed after this payment
    pub remaining_balance: Money,
}

impl Settlement {
    /// Settles `amount_tendered` against the invoice's current balance
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the invoice is already paid
    /// - `Validation("non-positive amount")` for zero or negative tender
    /// - `Validation` for tender finer than the currency's minor unit
    /// - `Validation` if non-cash tender exceeds the balance by more than the
    ///   tolerance; within the tolerance the whole tender is applied
    pub fn compute(
        invoice: &Invoice,
        amount_tendered: Decimal,
        method: PaymentMethod,
        policy: &BillingPolicy,
    ) -> Result<Self, BillingError> {
        invoice.ensure_payable()?;

        if amount_tendered <= Decimal::ZERO {
            return Err(BillingError::validation("non-positive amount"));
        }
        let dp = invoice.currency.decimal_places();
        if amount_tendered.round_dp(dp) != amount_tendered {
            return Err(BillingError::validation(format!(
                "amount {} has more than {} decimal places",
                amount_tendered, dp
            )));
        }

        let tendered = Money::new(amount_tendered, invoice.currency);
        let remaining = invoice.net_amount.checked_sub(&invoice.paid_amount)?;
        if !remaining.is_positive() {
            return Err(BillingError::invalid_state(format!(
                "invoice {} has no outstanding balance",
                invoice.id
            )));
        }

        let excess = tendered.checked_sub(&remaining)?;
        if !method.gives_change() && excess.amount() > policy.tolerance {
            return Err(BillingError::validation(format!(
                "amount exceeds outstanding balance of {}",
                remaining
            )));
        }

        // Card and check are charged exactly what was tendered; nothing is handed back
        let applied = if method.gives_change() {
            tendered.min(&remaining)?
        } else {
            tendered
        };
        let change = tendered.checked_sub(&applied)?;
        let new_paid = invoice.paid_amount.checked_add(&applied)?;
        let new_status = PaymentStatus::derive(&new_paid, &invoice.net_amount, policy.tolerance);

        let remaining_balance = invoice.net_amount.checked_sub(&new_paid)?;
        let remaining_balance = if remaining_balance.is_negative() {
            Money::zero(invoice.currency)
        } else {
            remaining_balance
        };

        Ok(Self {
            amount_tendered: tendered,
            amount_applied: applied,
            change_amount: change,
            new_paid_amount: new_paid,
            new_status,
            remaining_balance,
        })
    }
}

/// A payment ready to be committed against a specific invoice version
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub invoice_id: InvoiceId,
    /// Version of the invoice snapshot the settlement was computed from
    pub expected_version: i32,
    /// 1-based position among the invoice's payments
    pub sequence: i32,
    pub settlement: Settlement,
    pub method: PaymentMethod,
    pub cashier_id: UserId,
    pub receipt_number: ReceiptNumber,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl NewPayment {
    /// Prepares the next payment for the invoice snapshot
    pub fn prepare(
        invoice: &Invoice,
        settlement: Settlement,
        method: PaymentMethod,
        cashier_id: UserId,
        notes: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        let sequence = invoice.payment_count + 1;

        Self {
            invoice_id: invoice.id,
            expected_version: invoice.version,
            sequence,
            settlement,
            method,
            cashier_id,
            receipt_number: issue_receipt(invoice.id, sequence, paid_at),
            notes,
            paid_at,
        }
    }
}

/// A recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub sequence: i32,
    /// Amount posted to the invoice
    pub amount: Money,
    pub amount_tendered: Money,
    pub change_amount: Money,
    pub method: PaymentMethod,
    pub cashier_id: UserId,
    pub receipt_number: String,
    pub paid_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Payment {
    pub fn from_new(id: PaymentId, new: &NewPayment) -> Self {
        Self {
            id,
            invoice_id: new.invoice_id,
            sequence: new.sequence,
            amount: new.settlement.amount_applied,
            amount_tendered: new.settlement.amount_tendered,
            change_amount: new.settlement.change_amount,
            method: new.method,
            cashier_id: new.cashier_id,
            receipt_number: new.receipt_number.to_string(),
            paid_at: new.paid_at,
            notes: new.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, PatientId};
    use rust_decimal_macros::dec;

    use crate::invoice::DiscountType;

    fn invoice(net: Decimal, paid: Decimal) -> Invoice {
        let policy = BillingPolicy::default();
        let now = Utc::now();
        let paid = Money::new(paid, Currency::PHP);
        let net = Money::new(net, Currency::PHP);
        Invoice {
            id: InvoiceId::new(12),
            patient_id: PatientId::new(5),
            visit_id: None,
            currency: Currency::PHP,
            discount_type: DiscountType::None,
            total_amount: net,
            discount_amount: Money::zero(Currency::PHP),
            net_amount: net,
            paid_amount: paid,
            payment_status: PaymentStatus::derive(&paid, &net, policy.tolerance),
            payment_count: 0,
            version: 0,
            notes: None,
            created_by: UserId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_exact_cash_settles_invoice() {
        let s = Settlement::compute(&invoice(dec!(400), dec!(0)), dec!(400.00), PaymentMethod::Cash, &BillingPolicy::default()).unwrap();
        assert_eq!(s.amount_applied.amount(), dec!(400.00));
        assert!(s.change_amount.is_zero());
        assert_eq!(s.new_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_cash_overpayment_yields_change() {
        let s = Settlement::compute(&invoice(dec!(400), dec!(200)), dec!(250.00), PaymentMethod::Cash, &BillingPolicy::default()).unwrap();
        assert_eq!(s.amount_applied.amount(), dec!(200.00));
        assert_eq!(s.change_amount.amount(), dec!(50.00));
        assert_eq!(s.new_paid_amount.amount(), dec!(400.00));
        assert!(s.remaining_balance.is_zero());
    }

    #[test]
    fn test_card_overpayment_rejected() {
        let err = Settlement::compute(&invoice(dec!(400), dec!(200)), dec!(250.00), PaymentMethod::Card, &BillingPolicy::default()).unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[test]
    fn test_non_cash_within_tolerance_gives_no_change() {
        for method in [PaymentMethod::Card, PaymentMethod::Check] {
            let s = Settlement::compute(&invoice(dec!(400), dec!(0)), dec!(400.01), method, &BillingPolicy::default()).unwrap();
            assert!(s.change_amount.is_zero());
            assert_eq!(s.amount_applied.amount(), dec!(400.01));
            assert_eq!(s.new_paid_amount.amount(), dec!(400.01));
            assert!(s.remaining_balance.is_zero());
            assert_eq!(s.new_status, PaymentStatus::Paid);
        }
    }

    #[test]
    fn test_sub_centavo_tender_rejected() {
        let err = Settlement::compute(&invoice(dec!(400), dec!(0)), dec!(10.005), PaymentMethod::Cash, &BillingPolicy::default()).unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[test]
    fn test_non_positive_tender_rejected() {
        for amount in [dec!(0), dec!(-5)] {
            let err = Settlement::compute(&invoice(dec!(400), dec!(0)), amount, PaymentMethod::Cash, &BillingPolicy::default()).unwrap_err();
            assert_eq!(err.to_string(), "Validation error: non-positive amount");
        }
    }

    #[test]
    fn test_prepare_assigns_next_sequence_and_receipt() {
        let mut inv = invoice(dec!(400), dec!(100));
        inv.payment_count = 1;
        inv.version = 1;
        let paid_at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 3, 14, 9, 30, 0).unwrap();
        let s = Settlement::compute(&inv, dec!(100), PaymentMethod::Cash, &BillingPolicy::default()).unwrap();

        let p = NewPayment::prepare(&inv, s, PaymentMethod::Cash, UserId::new(4), None, paid_at);
        assert_eq!(p.sequence, 2);
        assert_eq!(p.expected_version, 1);
        assert_eq!(p.receipt_number.as_str(), "RCP-20260314-000012-02");
    }
}
