//! Billing ledger repository
//!
//! SQL for invoices, their line items and payments. Every write runs in one
//! transaction; a payment commit guards the invoice row with its version.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use domain_billing::{DiscountType, InvoiceFilter, InvoiceQuery, NewInvoice, NewPayment, PaymentMethod, PaymentStatus};

use crate::error::DatabaseError;

const INVOICE_COLUMNS: &str = r#"
    i.id, i.patient_id, i.visit_id, i.currency, i.discount_type,
    i.total_amount, i.discount_amount, i.net_amount, i.paid_amount,
    i.payment_status, i.payment_count, i.version, i.notes,
    i.created_by, i.created_at, i.updated_at
"#;

/// Repository for invoices and payments
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an invoice header and all of its lines in one transaction
    ///
    /// # Returns
    ///
    /// The generated invoice id
    #[instrument(skip(self, invoice), fields(lines = invoice.lines.len()))]
    pub async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<i64, DatabaseError> {
        let lines = invoice
            .lines
            .iter()
            .map(|line| Ok((line, int4(line.line_no, "line_no")?, int4(line.quantity, "quantity")?)))
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let mut tx = self.pool.begin().await?;

        let invoice_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                patient_id, visit_id, currency, discount_type,
                total_amount, discount_amount, net_amount,
                notes, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING id
            "#,
        )
        .bind(invoice.patient_id.value())
        .bind(invoice.visit_id.map(|v| v.value()))
        .bind(invoice.currency.code())
        .bind(DbDiscountType::from(invoice.discount_type))
        .bind(invoice.totals.total_amount.amount())
        .bind(invoice.totals.discount_amount.amount())
        .bind(invoice.totals.net_amount.amount())
        .bind(&invoice.notes)
        .bind(invoice.created_by.value())
        .bind(invoice.created_at)
        .fetch_one(&mut *tx)
        .await?;

        for (line, line_no, quantity) in lines {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    invoice_id, line_no, service_item_id, description,
                    unit_price, quantity, subtotal
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(invoice_id)
            .bind(line_no)
            .bind(line.service_item_id.value())
            .bind(&line.description)
            .bind(line.unit_price.amount())
            .bind(quantity)
            .bind(line.subtotal.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(invoice_id, "Invoice inserted");
        Ok(invoice_id)
    }

    pub async fn find_invoice(&self, id: i64) -> Result<Option<InvoiceRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM invoices i WHERE i.id = $1", INVOICE_COLUMNS);
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_line_items(&self, invoice_id: i64) -> Result<Vec<LineItemRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT line_no, service_item_id, description, unit_price, quantity, subtotal
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_payments(&self, invoice_id: i64) -> Result<Vec<PaymentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, invoice_id, sequence, amount, amount_tendered, change_amount,
                   payment_method, cashier_id, receipt_number, notes, paid_at
            FROM payments
            WHERE invoice_id = $1
            ORDER BY sequence
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Advances the invoice and records the payment in one transaction
    ///
    /// The update only matches while the invoice is still at
    /// `payment.expected_version`. When it matches nothing the transaction is
    /// dropped and rolled back.
    ///
    /// # Errors
    ///
    /// - `ConcurrentUpdate` if the version moved
    /// - `NotFound` if the invoice does not exist
    #[instrument(skip(self, payment), fields(invoice_id = payment.invoice_id.value(), expected_version = payment.expected_version))]
    pub async fn commit_payment(&self, payment: &NewPayment) -> Result<i64, DatabaseError> {
        let invoice_id = payment.invoice_id.value();
        let settlement = &payment.settlement;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET paid_amount = $3,
                payment_status = $4,
                payment_count = $5,
                version = version + 1,
                updated_at = $6
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(invoice_id)
        .bind(payment.expected_version)
        .bind(settlement.new_paid_amount.amount())
        .bind(DbPaymentStatus::from(settlement.new_status))
        .bind(payment.sequence)
        .bind(payment.paid_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM invoices WHERE id = $1)")
                .bind(invoice_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                DatabaseError::ConcurrentUpdate(format!(
                    "invoice {} is no longer at version {}",
                    payment.invoice_id, payment.expected_version
                ))
            } else {
                DatabaseError::not_found("Invoice", payment.invoice_id)
            });
        }

        let payment_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO payments (
                invoice_id, sequence, amount, amount_tendered, change_amount,
                payment_method, cashier_id, receipt_number, notes, paid_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(invoice_id)
        .bind(payment.sequence)
        .bind(settlement.amount_applied.amount())
        .bind(settlement.amount_tendered.amount())
        .bind(settlement.change_amount.amount())
        .bind(DbPaymentMethod::from(payment.method))
        .bind(payment.cashier_id.value())
        .bind(payment.receipt_number.as_str())
        .bind(&payment.notes)
        .bind(payment.paid_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payment_id)
    }

    /// One page of invoices matching the filter, newest first, with the
    /// total match count
    pub async fn list_invoices(
        &self,
        query: &InvoiceQuery,
    ) -> Result<(Vec<InvoiceSummaryRow>, i64), DatabaseError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM invoices i");
        push_filter(&mut count, &query.filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(INVOICE_COLUMNS);
        select.push(
            ", (SELECT COUNT(*) FROM invoice_line_items l WHERE l.invoice_id = i.id) AS item_count \
             FROM invoices i",
        );
        push_filter(&mut select, &query.filter);
        select
            .push(" ORDER BY i.created_at DESC, i.id DESC LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows = select
            .build_query_as::<InvoiceSummaryRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    /// Aggregates invoices created between `from` and `to` inclusive (UTC dates)
    pub async fn statistics(&self, from: NaiveDate, to: NaiveDate) -> Result<StatisticsRow, DatabaseError> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT
                COUNT(*) AS invoice_count,
                COUNT(*) FILTER (WHERE payment_status = 'unpaid') AS unpaid_count,
                COUNT(*) FILTER (WHERE payment_status = 'partial') AS partial_count,
                COUNT(*) FILTER (WHERE payment_status = 'paid') AS paid_count,
                COALESCE(SUM(net_amount), 0) AS total_billed,
                COALESCE(SUM(discount_amount), 0) AS total_discounts,
                COALESCE(SUM(paid_amount), 0) AS total_collected,
                COALESCE(SUM(net_amount - paid_amount), 0) AS outstanding
            FROM invoices
            WHERE (created_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &InvoiceFilter) {
    builder.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        builder
            .push(" AND i.payment_status = ")
            .push_bind(DbPaymentStatus::from(status));
    }
    if let Some(date) = filter.date {
        builder
            .push(" AND (i.created_at AT TIME ZONE 'UTC')::date = ")
            .push_bind(date);
    }
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(term);
        builder
            .push(" AND (('INV-' || LPAD(i.id::text, 6, '0')) ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR ('PAT-' || LPAD(i.patient_id::text, 6, '0')) ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.notes ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Wraps a search term for ILIKE, escaping its wildcards
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "discount_type", rename_all = "snake_case")]
pub enum DbDiscountType {
    None,
    Senior,
    Pwd,
}

impl From<DiscountType> for DbDiscountType {
    fn from(value: DiscountType) -> Self {
        match value {
            DiscountType::None => DbDiscountType::None,
            DiscountType::Senior => DbDiscountType::Senior,
            DiscountType::Pwd => DbDiscountType::Pwd,
        }
    }
}

impl From<DbDiscountType> for DiscountType {
    fn from(value: DbDiscountType) -> Self {
        match value {
            DbDiscountType::None => DiscountType::None,
            DbDiscountType::Senior => DiscountType::Senior,
            DbDiscountType::Pwd => DiscountType::Pwd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum DbPaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl From<PaymentStatus> for DbPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Unpaid => DbPaymentStatus::Unpaid,
            PaymentStatus::Partial => DbPaymentStatus::Partial,
            PaymentStatus::Paid => DbPaymentStatus::Paid,
        }
    }
}

impl From<DbPaymentStatus> for PaymentStatus {
    fn from(value: DbPaymentStatus) -> Self {
        match value {
            DbPaymentStatus::Unpaid => PaymentStatus::Unpaid,
            DbPaymentStatus::Partial => PaymentStatus::Partial,
            DbPaymentStatus::Paid => PaymentStatus::Paid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum DbPaymentMethod {
    Cash,
    Card,
    Check,
}

impl From<PaymentMethod> for DbPaymentMethod {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Cash => DbPaymentMethod::Cash,
            PaymentMethod::Card => DbPaymentMethod::Card,
            PaymentMethod::Check => DbPaymentMethod::Check,
        }
    }
}

impl From<DbPaymentMethod> for PaymentMethod {
    fn from(value: DbPaymentMethod) -> Self {
        match value {
            DbPaymentMethod::Cash => PaymentMethod::Cash,
            DbPaymentMethod::Card => PaymentMethod::Card,
            DbPaymentMethod::Check => PaymentMethod::Check,
        }
    }
}

/// Database row for an invoice header
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: i64,
    pub patient_id: i64,
    pub visit_id: Option<i64>,
    pub currency: String,
    pub discount_type: DbDiscountType,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub net_amount: Decimal,
    pub paid_amount: Decimal,
    pub payment_status: DbPaymentStatus,
    pub payment_count: i32,
    pub version: i32,
    pub notes: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice header with its line count, for list views
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceSummaryRow {
    #[sqlx(flatten)]
    pub invoice: InvoiceRow,
    pub item_count: i64,
}

/// Database row for an invoice line
#[derive(Debug, Clone, FromRow)]
pub struct LineItemRow {
    pub line_no: i32,
    pub service_item_id: i64,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// Database row for a payment
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub invoice_id: i64,
    pub sequence: i32,
    pub amount: Decimal,
    pub amount_tendered: Decimal,
    pub change_amount: Decimal,
    pub payment_method: DbPaymentMethod,
    pub cashier_id: i64,
    pub receipt_number: String,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Aggregated ledger totals
#[derive(Debug, Clone, FromRow)]
pub struct StatisticsRow {
    pub invoice_count: i64,
    pub unpaid_count: i64,
    pub partial_count: i64,
    pub paid_count: i64,
    pub total_billed: Decimal,
    pub total_discounts: Decimal,
    pub total_collected: Decimal,
    pub outstanding: Decimal,
}

/// Narrows a count to an INTEGER column without wrapping
fn int4(value: u32, column: &str) -> Result<i32, DatabaseError> {
    i32::try_from(value)
        .map_err(|_| DatabaseError::ConstraintViolation(format!("{} {} out of range", column, value)))
}
