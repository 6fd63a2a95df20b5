//! Billing DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{InvoiceId, PatientId, ServiceItemId, VisitId};
use domain_billing::{
    ApplyPaymentRequest, CreateInvoiceRequest, DiscountType, InvoiceFilter, ItemRequest,
    PaymentMethod, PaymentStatus, MAX_QUANTITY,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceBody {
    pub patient_id: Option<PatientId>,
    pub visit_id: Option<VisitId>,
    #[validate(
        length(max = 200, message = "at most 200 items"),
        custom(function = "quantities_within_limit")
    )]
    pub items: Vec<ItemLineBody>,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// A requested line; there is no price field
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemLineBody {
    pub service_item_id: ServiceItemId,
    /// Lines below 1 are dropped by the ledger, so only the upper bound is checked here
    pub quantity: i64,
}

fn quantities_within_limit(items: &[ItemLineBody]) -> Result<(), ValidationError> {
    if items.iter().all(|line| line.quantity <= i64::from(MAX_QUANTITY)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("quantity_out_of_range");
        err.message = Some(format!("quantity must be at most {}", MAX_QUANTITY).into());
        Err(err)
    }
}

impl From<CreateInvoiceBody> for CreateInvoiceRequest {
    fn from(body: CreateInvoiceBody) -> Self {
        CreateInvoiceRequest {
            patient_id: body.patient_id,
            visit_id: body.visit_id,
            items: body
                .items
                .into_iter()
                .map(|line| ItemRequest::new(line.service_item_id, line.quantity))
                .collect(),
            discount_type: body.discount_type,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedInvoiceResponse {
    pub id: InvoiceId,
    pub invoice_number: String,
}

impl From<InvoiceId> for CreatedInvoiceResponse {
    fn from(id: InvoiceId) -> Self {
        Self {
            id,
            invoice_number: id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyPaymentBody {
    #[validate(custom(function = "positive_amount"))]
    pub amount_tendered: Decimal,
    #[serde(default = "default_method")]
    pub method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

fn default_method() -> PaymentMethod {
    PaymentMethod::Cash
}

fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("non_positive_amount"))
    }
}

impl ApplyPaymentBody {
    pub fn into_request(self, invoice_id: InvoiceId) -> ApplyPaymentRequest {
        ApplyPaymentRequest {
            invoice_id,
            amount_tendered: self.amount_tendered,
            method: self.method,
            notes: self.notes,
        }
    }
}

/// `GET /invoices` query string
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListInvoicesParams {
    #[validate(length(max = 100))]
    pub search: Option<String>,
    pub status: Option<PaymentStatus>,
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListInvoicesParams {
    pub fn filter(&self) -> InvoiceFilter {
        InvoiceFilter {
            search_text: self.search.clone(),
            status: self.status,
            date: self.date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}
