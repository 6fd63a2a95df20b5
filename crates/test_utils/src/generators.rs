//! Property-Based Test Generators
//!
//! Proptest strategies for catalog prices, invoice contents and payment
//! sequences.

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::ServiceItemId;
use domain_billing::{CatalogItem, DiscountType};

use crate::fixtures::php;

/// Strategy for catalog prices from 0.01 to 99,999.99 in centavos
pub fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strategy for line quantities
pub fn quantity_strategy() -> impl Strategy<Value = u32> {
    1u32..20u32
}

/// Strategy for discount categories
pub fn discount_type_strategy() -> impl Strategy<Value = DiscountType> {
    prop_oneof![
        Just(DiscountType::None),
        Just(DiscountType::Senior),
        Just(DiscountType::Pwd),
    ]
}

/// Strategy for a catalog of 1..=8 billable items with ids 1..=n
pub fn catalog_strategy() -> impl Strategy<Value = Vec<CatalogItem>> {
    proptest::collection::vec(price_strategy(), 1..=8).prop_map(|prices| {
        prices
            .into_iter()
            .enumerate()
            .map(|(i, price)| {
                let id = i as i64 + 1;
                CatalogItem::new(ServiceItemId::new(id), format!("Service {}", id), php(price))
            })
            .collect()
    })
}

/// Strategy for (catalog index, quantity) pairs against a catalog of `size` items
pub fn line_requests_strategy(size: usize) -> impl Strategy<Value = Vec<(usize, u32)>> {
    proptest::collection::vec((0..size, quantity_strategy()), 1..=6)
}

/// Strategy for payment amounts, in centavos, that together cover `total_minor`
///
/// Every part is at least one centavo and the parts sum to exactly
/// `total_minor`. `total_minor` must be at least 1.
pub fn payment_split_strategy(total_minor: i64) -> impl Strategy<Value = Vec<Decimal>> {
    proptest::collection::vec(1i64..=100i64, 1..=5).prop_map(move |weights| {
        let parts = (weights.len() as i64).min(total_minor).max(1) as usize;
        let weights = &weights[..parts];
        let weight_sum: i64 = weights.iter().sum();

        let mut amounts: Vec<i64> = weights
            .iter()
            .map(|w| (total_minor * w / weight_sum).max(1))
            .collect();
        let assigned: i64 = amounts.iter().sum();
        let last = amounts.len() - 1;
        amounts[last] += total_minor - assigned;
        if amounts[last] < 1 {
            // rounding overshoot, fall back to a single payment
            amounts = vec![total_minor];
        }

        amounts.into_iter().map(|m| Decimal::new(m, 2)).collect()
    })
}
