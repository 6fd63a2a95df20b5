//! Custom Test Assertions
//!
//! Assertion helpers for money values and ledger invariants with more useful
//! failure messages than plain `assert_eq!`.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_billing::{InvoiceDetail, PaymentStatus};

/// Asserts that a Money value has exactly the expected amount
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Expected {} {}, got {}",
        actual.currency().symbol(),
        expected,
        actual
    );
}

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts every ledger invariant that can be checked from an invoice detail
///
/// - total equals the sum of line subtotals
/// - net equals total less discount
/// - paid equals the sum of posted payment amounts
/// - paid stays within `0..=net + tolerance`
/// - status is the one derived from paid and net
/// - receipt numbers are distinct and sequences run 1..=n
pub fn assert_invoice_consistent(detail: &InvoiceDetail, tolerance: Decimal) {
    let invoice = &detail.invoice;

    let line_sum: Decimal = detail.line_items.iter().map(|l| l.subtotal.amount()).sum();
    assert_eq!(
        invoice.total_amount.amount(),
        line_sum,
        "{}: total {} does not equal line sum {}",
        invoice.invoice_number(),
        invoice.total_amount,
        line_sum
    );

    assert_eq!(
        invoice.net_amount.amount(),
        invoice.total_amount.amount() - invoice.discount_amount.amount(),
        "{}: net is not total less discount",
        invoice.invoice_number()
    );

    let payment_sum: Decimal = detail.payments.iter().map(|p| p.amount.amount()).sum();
    assert_eq!(
        invoice.paid_amount.amount(),
        payment_sum,
        "{}: paid {} does not equal sum of payments {}",
        invoice.invoice_number(),
        invoice.paid_amount,
        payment_sum
    );

    assert!(
        !invoice.paid_amount.is_negative(),
        "{}: negative paid amount {}",
        invoice.invoice_number(),
        invoice.paid_amount
    );
    assert!(
        invoice.paid_amount.amount() <= invoice.net_amount.amount() + tolerance,
        "{}: overpaid ({} > {})",
        invoice.invoice_number(),
        invoice.paid_amount,
        invoice.net_amount
    );

    let derived = PaymentStatus::derive(&invoice.paid_amount, &invoice.net_amount, tolerance);
    assert_eq!(
        invoice.payment_status,
        derived,
        "{}: stored status {} but amounts imply {}",
        invoice.invoice_number(),
        invoice.payment_status,
        derived
    );

    let mut receipts: Vec<&str> = detail.payments.iter().map(|p| p.receipt_number.as_str()).collect();
    receipts.sort_unstable();
    receipts.dedup();
    assert_eq!(
        receipts.len(),
        detail.payments.len(),
        "{}: duplicate receipt numbers",
        invoice.invoice_number()
    );

    let sequences: Vec<i32> = detail.payments.iter().map(|p| p.sequence).collect();
    let expected: Vec<i32> = (1..=detail.payments.len() as i32).collect();
    assert_eq!(sequences, expected, "{}: payment sequences out of order", invoice.invoice_number());
    assert_eq!(invoice.payment_count, detail.payments.len() as i32);
}
