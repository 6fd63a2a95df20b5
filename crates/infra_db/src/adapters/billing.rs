//! PostgreSQL Ledger Store
//!
//! Implements `LedgerStore` on top of `BillingRepository`, converting rows to
//! domain types and database errors to `BillingError`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{debug, instrument};

use core_kernel::{
    Currency, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, Money, PatientId,
    PaymentId, ServiceItemId, UserId, VisitId,
};
use domain_billing::{
    BillingError, BillingStatistics, Invoice, InvoiceDetail, InvoicePage, InvoiceQuery,
    InvoiceSummary, LedgerStore, LineItem, NewInvoice, NewPayment, Payment,
};

use crate::error::DatabaseError;
use crate::repositories::billing::{
    BillingRepository, InvoiceRow, LineItemRow, PaymentRow, StatisticsRow,
};

const ADAPTER_ID: &str = "postgres-ledger-store";

/// PostgreSQL-backed ledger store
///
/// Payment commits rely on the invoice `version` column; the schema's CHECK
/// constraints and the UNIQUE receipt number back up the domain rules.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    repository: BillingRepository,
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillingRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &BillingRepository {
        &self.repository
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, invoice), fields(patient = %invoice.patient_id))]
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, BillingError> {
        let id = self.repository.insert_invoice(&invoice).await?;
        Ok(Invoice::from_new(InvoiceId::new(id), &invoice))
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, BillingError> {
        debug!(invoice = %id, "Fetching invoice");
        match self.repository.find_invoice(id.value()).await? {
            Some(row) => Ok(Some(row_to_invoice(row)?)),
            None => Ok(None),
        }
    }

    async fn commit_payment(&self, payment: NewPayment) -> Result<Payment, BillingError> {
        let id = self.repository.commit_payment(&payment).await?;
        Ok(Payment::from_new(PaymentId::new(id), &payment))
    }

    #[instrument(skip(self, query), fields(page = query.page, page_size = query.page_size))]
    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<InvoicePage, BillingError> {
        let (rows, total) = self.repository.list_invoices(query).await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let count = row.item_count as u32;
                row_to_invoice(row.invoice).map(|inv| InvoiceSummary::from_invoice(&inv, count))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InvoicePage {
            items,
            total: total as u64,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn get_invoice_detail(&self, id: InvoiceId) -> Result<Option<InvoiceDetail>, BillingError> {
        let Some(row) = self.repository.find_invoice(id.value()).await? else {
            return Ok(None);
        };
        let invoice = row_to_invoice(row)?;
        let currency = invoice.currency;

        let line_items = self
            .repository
            .find_line_items(id.value())
            .await?
            .into_iter()
            .map(|row| row_to_line_item(row, currency))
            .collect();
        let payments = self
            .repository
            .find_payments(id.value())
            .await?
            .into_iter()
            .map(|row| row_to_payment(row, currency))
            .collect();

        Ok(Some(InvoiceDetail {
            invoice,
            line_items,
            payments,
        }))
    }

    async fn statistics(&self, from: NaiveDate, to: NaiveDate) -> Result<BillingStatistics, BillingError> {
        let row = self.repository.statistics(from, to).await?;
        Ok(row_to_statistics(row, from, to))
    }
}

fn parse_currency(code: &str) -> Result<Currency, DatabaseError> {
    Currency::from_str(code).map_err(|e| DatabaseError::CorruptRow(e.to_string()))
}

fn row_to_invoice(row: InvoiceRow) -> Result<Invoice, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    let money = |amount| Money::new(amount, currency);

    Ok(Invoice {
        id: InvoiceId::new(row.id),
        patient_id: PatientId::new(row.patient_id),
        visit_id: row.visit_id.map(VisitId::new),
        currency,
        discount_type: row.discount_type.into(),
        total_amount: money(row.total_amount),
        discount_amount: money(row.discount_amount),
        net_amount: money(row.net_amount),
        paid_amount: money(row.paid_amount),
        payment_status: row.payment_status.into(),
        payment_count: row.payment_count,
        version: row.version,
        notes: row.notes,
        created_by: UserId::new(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_line_item(row: LineItemRow, currency: Currency) -> LineItem {
    LineItem {
        line_no: row.line_no as u32,
        service_item_id: ServiceItemId::new(row.service_item_id),
        description: row.description,
        unit_price: Money::new(row.unit_price, currency),
        quantity: row.quantity as u32,
        subtotal: Money::new(row.subtotal, currency),
    }
}

fn row_to_payment(row: PaymentRow, currency: Currency) -> Payment {
    Payment {
        id: PaymentId::new(row.id),
        invoice_id: InvoiceId::new(row.invoice_id),
        sequence: row.sequence,
        amount: Money::new(row.amount, currency),
        amount_tendered: Money::new(row.amount_tendered, currency),
        change_amount: Money::new(row.change_amount, currency),
        method: row.payment_method.into(),
        cashier_id: UserId::new(row.cashier_id),
        receipt_number: row.receipt_number,
        paid_at: row.paid_at,
        notes: row.notes,
    }
}

fn row_to_statistics(row: StatisticsRow, from: NaiveDate, to: NaiveDate) -> BillingStatistics {
    BillingStatistics {
        from,
        to,
        invoice_count: row.invoice_count as u64,
        unpaid_count: row.unpaid_count as u64,
        partial_count: row.partial_count as u64,
        paid_count: row.paid_count as u64,
        total_billed: row.total_billed,
        total_discounts: row.total_discounts,
        total_collected: row.total_collected,
        outstanding: row.outstanding,
    }
}
