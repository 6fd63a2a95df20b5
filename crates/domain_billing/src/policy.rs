//! Billing policy
//!
//! Clinic-wide settings that shape pricing and settlement.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, Rate};

/// Pricing and settlement rules applied by the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPolicy {
    /// Currency every invoice is issued in
    pub currency: Currency,
    /// Discount applied to senior citizen and PWD invoices
    pub concession_rate: Rate,
    /// Rounding tolerance when comparing paid and net amounts
    pub tolerance: Decimal,
    /// Whether invoices must reference a clinic visit
    pub require_visit: bool,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            currency: Currency::PHP,
            concession_rate: Rate::from_percentage(dec!(20)),
            tolerance: dec!(0.01),
            require_visit: false,
        }
    }
}

impl BillingPolicy {
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_concession_rate(mut self, rate: Rate) -> Self {
        self.concession_rate = rate;
        self
    }

    pub fn requiring_visit(mut self, required: bool) -> Self {
        self.require_visit = required;
        self
    }

    /// The tolerance as an amount in the ledger currency
    pub fn tolerance_amount(&self) -> Money {
        Money::new(self.tolerance, self.currency)
    }
}
