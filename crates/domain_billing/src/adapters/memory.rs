//! In-memory ledger and catalog
//!
//! All ledger state sits behind a single lock. Each write takes the lock
//! once, validates, and then mutates, so a failed write leaves nothing
//! behind and a version check cannot interleave with another commit.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

use chrono::NaiveDate;

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, PaymentId, ServiceItemId,
};

use crate::catalog::{CatalogItem, CatalogPort};
use crate::error::BillingError;
use crate::invoice::{Invoice, LineItem, NewInvoice};
use crate::payment::{NewPayment, Payment};
use crate::ports::LedgerStore;
use crate::query::{BillingStatistics, InvoiceDetail, InvoicePage, InvoiceQuery, InvoiceSummary};

const ADAPTER_ID: &str = "in_memory_ledger";

#[derive(Debug, Default)]
struct LedgerState {
    last_invoice_id: i64,
    last_payment_id: i64,
    invoices: BTreeMap<InvoiceId, Invoice>,
    lines: HashMap<InvoiceId, Vec<LineItem>>,
    payments: HashMap<InvoiceId, Vec<Payment>>,
    receipts: HashSet<String>,
}

/// Ledger store holding everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
    unavailable: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a storage error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn invoice_count(&self) -> usize {
        self.state.read().await.invoices.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.values().map(Vec::len).sum()
    }

    fn ensure_available(&self) -> Result<(), BillingError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BillingError::storage("ledger store is unavailable"));
        }
        Ok(())
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        match self.ensure_available() {
            Ok(()) => HealthCheckResult::healthy(ADAPTER_ID, start.elapsed().as_millis() as u64),
            Err(e) => HealthCheckResult::unhealthy(
                ADAPTER_ID,
                start.elapsed().as_millis() as u64,
                e.to_string(),
            ),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, BillingError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        state.last_invoice_id += 1;
        let id = InvoiceId::new(state.last_invoice_id);
        let stored = Invoice::from_new(id, &invoice);

        state.invoices.insert(id, stored.clone());
        state.lines.insert(id, invoice.lines);
        state.payments.insert(id, Vec::new());
        debug!(invoice = %id, "Stored invoice in memory");

        Ok(stored)
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, BillingError> {
        self.ensure_available()?;
        Ok(self.state.read().await.invoices.get(&id).cloned())
    }

    async fn commit_payment(&self, payment: NewPayment) -> Result<Payment, BillingError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let invoice = state
            .invoices
            .get(&payment.invoice_id)
            .ok_or_else(|| BillingError::not_found(format!("invoice {}", payment.invoice_id)))?;
        if invoice.version != payment.expected_version {
            return Err(BillingError::conflict(format!(
                "invoice {} changed (expected version {}, found {})",
                payment.invoice_id, payment.expected_version, invoice.version
            )));
        }
        if state.receipts.contains(payment.receipt_number.as_str()) {
            return Err(BillingError::conflict(format!(
                "receipt {} already issued",
                payment.receipt_number
            )));
        }

        state.last_payment_id += 1;
        let recorded = Payment::from_new(PaymentId::new(state.last_payment_id), &payment);

        if let Some(invoice) = state.invoices.get_mut(&payment.invoice_id) {
            invoice.apply(&payment);
        }
        state.receipts.insert(recorded.receipt_number.clone());
        state
            .payments
            .entry(payment.invoice_id)
            .or_default()
            .push(recorded.clone());

        Ok(recorded)
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<InvoicePage, BillingError> {
        self.ensure_available()?;
        let state = self.state.read().await;

        let mut matching: Vec<&Invoice> = state
            .invoices
            .values()
            .filter(|inv| query.filter.matches(inv))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .map(|inv| {
                let count = state.lines.get(&inv.id).map_or(0, Vec::len) as u32;
                InvoiceSummary::from_invoice(inv, count)
            })
            .collect();

        Ok(InvoicePage {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn get_invoice_detail(&self, id: InvoiceId) -> Result<Option<InvoiceDetail>, BillingError> {
        self.ensure_available()?;
        let state = self.state.read().await;

        Ok(state.invoices.get(&id).map(|invoice| InvoiceDetail {
            invoice: invoice.clone(),
            line_items: state.lines.get(&id).cloned().unwrap_or_default(),
            payments: state.payments.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn statistics(&self, from: NaiveDate, to: NaiveDate) -> Result<BillingStatistics, BillingError> {
        self.ensure_available()?;
        let state = self.state.read().await;

        let mut stats = BillingStatistics::empty(from, to);
        for invoice in state.invoices.values() {
            let created = invoice.created_at.date_naive();
            if created >= from && created <= to {
                stats.record(invoice);
            }
        }
        Ok(stats)
    }
}

/// Catalog backed by a map
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<ServiceItemId, CatalogItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|item| (item.id, item)).collect()),
        }
    }

    /// Adds or replaces an item, e.g. to model a price change
    pub async fn upsert(&self, item: CatalogItem) {
        self.items.write().await.insert(item.id, item);
    }
}

impl DomainPort for InMemoryCatalog {}

#[async_trait]
impl CatalogPort for InMemoryCatalog {
    async fn get_item(&self, id: ServiceItemId) -> Result<Option<CatalogItem>, BillingError> {
        Ok(self.items.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{Currency, Money, PatientId, UserId};
    use rust_decimal_macros::dec;

    use crate::invoice::{DiscountType, InvoiceHeader};
    use crate::payment::{PaymentMethod, Settlement};
    use crate::policy::BillingPolicy;

    fn new_invoice() -> NewInvoice {
        let policy = BillingPolicy::default();
        let header = InvoiceHeader::validate(
            Some(PatientId::new(1)),
            None,
            DiscountType::None,
            None,
            UserId::new(1),
            &policy,
        )
        .unwrap();
        let item = CatalogItem::new(ServiceItemId::new(1), "Consultation", Money::new(dec!(500), Currency::PHP));
        let lines = vec![LineItem::priced(1, &item, 1).unwrap()];
        NewInvoice::assemble(header, lines, &policy).unwrap()
    }

    fn payment_for(invoice: &Invoice, amount: rust_decimal::Decimal) -> NewPayment {
        let s = Settlement::compute(invoice, amount, PaymentMethod::Cash, &BillingPolicy::default()).unwrap();
        NewPayment::prepare(invoice, s, PaymentMethod::Cash, UserId::new(2), None, Utc::now())
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = InMemoryLedgerStore::new();
        let invoice = store.insert_invoice(new_invoice()).await.unwrap();

        let first = payment_for(&invoice, dec!(100));
        let second = payment_for(&invoice, dec!(100));
        store.commit_payment(first).await.unwrap();

        let err = store.commit_payment(second).await.unwrap_err();
        assert!(err.is_retryable());

        let stored = store.get_invoice(invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.paid_amount.amount(), dec!(100));
        assert_eq!(stored.version, 1);
        assert_eq!(store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_reports_unhealthy() {
        let store = InMemoryLedgerStore::new();
        assert!(store.health_check().await.is_operational());

        store.set_unavailable(true);
        assert!(!store.health_check().await.is_operational());
        assert!(matches!(
            store.insert_invoice(new_invoice()).await,
            Err(BillingError::Storage(_))
        ));
        assert_eq!(store.invoice_count().await, 0);
    }
}
