//! Billing application service
//!
//! Orchestrates the ledger operations on top of the store and catalog ports.
//! Every operation receives the calling [`Actor`] and checks one capability
//! before touching any state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    Actor, Capability, HealthCheckResult, InvoiceId, Money, PatientId, PaymentId,
    ServiceItemId, VisitId,
};

use crate::catalog::CatalogPort;
use crate::error::BillingError;
use crate::invoice::{
    normalize_notes, DiscountType, InvoiceHeader, LineItem, NewInvoice, PaymentStatus, MAX_QUANTITY,
};
use crate::payment::{NewPayment, PaymentMethod, Settlement};
use crate::policy::BillingPolicy;
use crate::ports::LedgerStore;
use crate::query::{BillingStatistics, InvoiceDetail, InvoiceFilter, InvoicePage, InvoiceQuery};

/// One requested service line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub service_item_id: ServiceItemId,
    /// As submitted; lines with quantity below 1 are dropped
    pub quantity: i64,
}

impl ItemRequest {
    pub fn new(service_item_id: ServiceItemId, quantity: i64) -> Self {
        Self {
            service_item_id,
            quantity,
        }
    }
}

/// Input to invoice creation
///
/// There is deliberately no price field: every line is priced from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub patient_id: Option<PatientId>,
    pub visit_id: Option<VisitId>,
    pub items: Vec<ItemRequest>,
    pub discount_type: DiscountType,
    pub notes: Option<String>,
}

/// Input to payment application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyPaymentRequest {
    pub invoice_id: InvoiceId,
    /// Money handed over; may exceed the balance for cash
    pub amount_tendered: Decimal,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl ApplyPaymentRequest {
    pub fn new(invoice_id: InvoiceId, amount_tendered: Decimal, method: PaymentMethod) -> Self {
        Self {
            invoice_id,
            amount_tendered,
            method,
            notes: None,
        }
    }

    pub fn cash(invoice_id: InvoiceId, amount_tendered: Decimal) -> Self {
        Self::new(invoice_id, amount_tendered, PaymentMethod::Cash)
    }
}

/// Result of a successful payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment_id: PaymentId,
    pub receipt_number: String,
    pub amount_applied: Money,
    pub change_amount: Money,
    pub new_status: PaymentStatus,
    pub remaining_balance: Money,
}

/// Retry settings for [`BillingService::apply_payment_with_retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Base delay, multiplied by the attempt number
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }
}

/// The billing ledger's operation surface
#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn LedgerStore>,
    catalog: Arc<dyn CatalogPort>,
    policy: BillingPolicy,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        catalog: Arc<dyn CatalogPort>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            policy,
        }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Creates an invoice priced entirely from the catalog
    ///
    /// Requested items that are missing, inactive, priced in another currency
    /// or have a quantity below 1 are left off the invoice rather than failing
    /// the request.
    ///
    /// # Errors
    ///
    /// - `Validation("missing patient")`, `Validation("missing visit")`
    /// - `Validation` for a quantity above [`MAX_QUANTITY`] or an amount too
    ///   large to store
    /// - `Validation("no items")` if no requested item survives filtering
    /// - `Storage` if the invoice could not be written; nothing is persisted
    #[instrument(skip(self, actor, request), fields(user = %actor.user_id, patient = ?request.patient_id))]
    pub async fn create_invoice(
        &self,
        actor: &Actor,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceId, BillingError> {
        authorize(actor, Capability::CreateInvoice)?;

        let header = InvoiceHeader::validate(
            request.patient_id,
            request.visit_id,
            request.discount_type,
            request.notes,
            actor.user_id,
            &self.policy,
        )?;

        let mut lines: Vec<LineItem> = Vec::with_capacity(request.items.len());
        for item_request in &request.items {
            if item_request.quantity < 1 {
                warn!(
                    service_item = %item_request.service_item_id,
                    quantity = item_request.quantity,
                    "Dropping line with invalid quantity"
                );
                continue;
            }
            let quantity = u32::try_from(item_request.quantity)
                .ok()
                .filter(|q| *q <= MAX_QUANTITY)
                .ok_or_else(|| {
                    BillingError::validation(format!(
                        "quantity {} exceeds the maximum of {}",
                        item_request.quantity, MAX_QUANTITY
                    ))
                })?;

            match self.catalog.get_item(item_request.service_item_id).await? {
                Some(item) if item.is_billable() && item.unit_price.currency() != self.policy.currency => {
                    warn!(
                        service_item = %item.id,
                        currency = %item.unit_price.currency(),
                        "Dropping line priced in a foreign currency"
                    );
                }
                Some(item) if item.is_billable() => {
                    let line_no = lines.len() as u32 + 1;
                    lines.push(LineItem::priced(line_no, &item, quantity)?);
                }
                Some(item) => {
                    warn!(service_item = %item.id, "Dropping line for inactive service item");
                }
                None => {
                    warn!(service_item = %item_request.service_item_id, "Dropping line for unknown service item");
                }
            }
        }

        let new_invoice = NewInvoice::assemble(header, lines, &self.policy)?;
        let line_count = new_invoice.lines.len();
        let invoice = self.store.insert_invoice(new_invoice).await?;

        info!(
            invoice = %invoice.id,
            lines = line_count,
            total = %invoice.total_amount,
            discount = %invoice.discount_amount,
            net = %invoice.net_amount,
            "Invoice created"
        );

        Ok(invoice.id)
    }

    /// Applies tendered money to an invoice's outstanding balance
    ///
    /// The payment row and the invoice update are committed together against
    /// the invoice version that was read. A concurrent payment that committed
    /// first makes this call fail with `Conflict` without writing anything.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invoice does not exist
    /// - `InvalidState` if the invoice is already paid
    /// - `Validation("non-positive amount")` and other tender checks
    /// - `Conflict` if a concurrent payment won the race
    #[instrument(skip(self, actor, request), fields(user = %actor.user_id, invoice = %request.invoice_id))]
    pub async fn apply_payment(
        &self,
        actor: &Actor,
        request: ApplyPaymentRequest,
    ) -> Result<PaymentOutcome, BillingError> {
        authorize(actor, Capability::ApplyPayment)?;
        let notes = normalize_notes(request.notes)?;

        let invoice = self
            .store
            .get_invoice(request.invoice_id)
            .await?
            .ok_or_else(|| BillingError::not_found(format!("invoice {}", request.invoice_id)))?;
        debug!(version = invoice.version, paid = %invoice.paid_amount, "Read invoice snapshot");

        let settlement =
            Settlement::compute(&invoice, request.amount_tendered, request.method, &self.policy)?;
        let new_payment = NewPayment::prepare(
            &invoice,
            settlement,
            request.method,
            actor.user_id,
            notes,
            Utc::now(),
        );

        let payment = self.store.commit_payment(new_payment).await?;

        info!(
            payment = %payment.id,
            receipt = %payment.receipt_number,
            applied = %settlement.amount_applied,
            change = %settlement.change_amount,
            status = %settlement.new_status,
            "Payment applied"
        );

        Ok(PaymentOutcome {
            payment_id: payment.id,
            receipt_number: payment.receipt_number,
            amount_applied: settlement.amount_applied,
            change_amount: settlement.change_amount,
            new_status: settlement.new_status,
            remaining_balance: settlement.remaining_balance,
        })
    }

    /// [`apply_payment`](Self::apply_payment), re-run on `Conflict`
    ///
    /// Each attempt re-reads the invoice, so a retry settles against the
    /// balance left by whichever payment won.
    pub async fn apply_payment_with_retry(
        &self,
        actor: &Actor,
        request: ApplyPaymentRequest,
        retry: RetryPolicy,
    ) -> Result<PaymentOutcome, BillingError> {
        let mut attempt = 1;
        loop {
            match self.apply_payment(actor, request.clone()).await {
                Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                    warn!(invoice = %request.invoice_id, attempt, "Payment conflicted, retrying");
                    tokio::time::sleep(retry.backoff * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Lists invoice summaries
    pub async fn list_invoices(
        &self,
        actor: &Actor,
        filter: InvoiceFilter,
        page: u32,
        page_size: u32,
    ) -> Result<InvoicePage, BillingError> {
        authorize(actor, Capability::ViewInvoices)?;
        let query = InvoiceQuery::new(filter, page, page_size);
        self.store.list_invoices(&query).await
    }

    /// Reads an invoice with its lines and payments
    pub async fn get_invoice_detail(
        &self,
        actor: &Actor,
        invoice_id: InvoiceId,
    ) -> Result<InvoiceDetail, BillingError> {
        authorize(actor, Capability::ViewInvoices)?;
        self.store
            .get_invoice_detail(invoice_id)
            .await?
            .ok_or_else(|| BillingError::not_found(format!("invoice {}", invoice_id)))
    }

    /// Aggregates billing totals for invoices created in `from..=to`
    pub async fn statistics(
        &self,
        actor: &Actor,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BillingStatistics, BillingError> {
        authorize(actor, Capability::ViewStatistics)?;
        if from > to {
            return Err(BillingError::validation(format!(
                "date range starts after it ends ({} > {})",
                from, to
            )));
        }
        self.store.statistics(from, to).await
    }

    /// Health of the underlying store
    pub async fn health(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}

fn authorize(actor: &Actor, capability: Capability) -> Result<(), BillingError> {
    if actor.can(capability) {
        Ok(())
    } else {
        warn!(user = %actor.user_id, role = %actor.role, %capability, "Capability check failed");
        Err(BillingError::Forbidden(capability))
    }
}
