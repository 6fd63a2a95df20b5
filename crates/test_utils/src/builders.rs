//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out the fields they
//! care about.

use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{InvoiceId, PatientId, ServiceItemId, VisitId};
use domain_billing::{
    ApplyPaymentRequest, CreateInvoiceRequest, DiscountType, ItemRequest, PaymentMethod,
};

use crate::fixtures::{CatalogFixtures, IdFixtures};

/// Builder for invoice creation requests
///
/// Defaults to the fixture patient with no items and no discount.
#[derive(Debug, Clone)]
pub struct CreateInvoiceRequestBuilder {
    request: CreateInvoiceRequest,
}

impl Default for CreateInvoiceRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateInvoiceRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: CreateInvoiceRequest {
                patient_id: Some(IdFixtures::patient()),
                ..Default::default()
            },
        }
    }

    /// One consultation plus two blood counts, total 500.00
    pub fn standard_visit() -> Self {
        Self::new()
            .with_item(CatalogFixtures::CONSULTATION, 1)
            .with_item(CatalogFixtures::CBC, 2)
    }

    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.request.patient_id = Some(patient_id);
        self
    }

    pub fn without_patient(mut self) -> Self {
        self.request.patient_id = None;
        self
    }

    pub fn with_visit(mut self, visit_id: VisitId) -> Self {
        self.request.visit_id = Some(visit_id);
        self
    }

    pub fn with_item(mut self, service_item_id: ServiceItemId, quantity: i64) -> Self {
        self.request.items.push(ItemRequest::new(service_item_id, quantity));
        self
    }

    pub fn with_discount(mut self, discount_type: DiscountType) -> Self {
        self.request.discount_type = discount_type;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.request.notes = Some(notes.into());
        self
    }

    /// Attaches a random sentence as notes
    pub fn with_random_notes(self) -> Self {
        let sentence: String = Sentence(3..8).fake();
        self.with_notes(sentence)
    }

    pub fn build(self) -> CreateInvoiceRequest {
        self.request
    }
}

/// Builder for payment requests, cash by default
#[derive(Debug, Clone)]
pub struct ApplyPaymentRequestBuilder {
    request: ApplyPaymentRequest,
}

impl ApplyPaymentRequestBuilder {
    pub fn new(invoice_id: InvoiceId, amount_tendered: Decimal) -> Self {
        Self {
            request: ApplyPaymentRequest::cash(invoice_id, amount_tendered),
        }
    }

    pub fn by(mut self, method: PaymentMethod) -> Self {
        self.request.method = method;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.request.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> ApplyPaymentRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_visit_defaults() {
        let request = CreateInvoiceRequestBuilder::standard_visit().build();

        assert_eq!(request.patient_id, Some(IdFixtures::patient()));
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.discount_type, DiscountType::None);
        assert!(request.notes.is_none());
    }

    #[test]
    fn test_random_notes_are_populated() {
        let request = CreateInvoiceRequestBuilder::new().with_random_notes().build();
        assert!(request.notes.is_some_and(|n| !n.trim().is_empty()));
    }
}
