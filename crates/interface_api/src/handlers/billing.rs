//! Billing handlers
//!
//! Thin adapters over [`domain_billing::BillingService`]: decode and validate
//! the request, pass the resolved actor through, encode the result.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use core_kernel::{Actor, InvoiceId};
use domain_billing::{
    query::DEFAULT_PAGE_SIZE, BillingStatistics, InvoiceDetail, InvoicePage, PaymentOutcome,
};

use crate::dto::billing::*;
use crate::{error::ApiError, AppState};

/// Creates an invoice priced from the service catalog
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateInvoiceBody>,
) -> Result<(StatusCode, Json<CreatedInvoiceResponse>), ApiError> {
    body.validate()?;
    let id = state.service.create_invoice(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(id.into())))
}

/// Lists invoices, newest first
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<InvoicePage>, ApiError> {
    params.validate()?;
    let page = state
        .service
        .list_invoices(
            &actor,
            params.filter(),
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(page))
}

/// Gets an invoice with its lines and payments
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceDetail>, ApiError> {
    let detail = state
        .service
        .get_invoice_detail(&actor, InvoiceId::new(id))
        .await?;
    Ok(Json(detail))
}

/// Applies a payment to an invoice
///
/// Lost races against a concurrent payment are retried per the configured
/// policy before surfacing as 409.
pub async fn apply_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<ApplyPaymentBody>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    body.validate()?;
    let outcome = state
        .service
        .apply_payment_with_retry(&actor, body.into_request(InvoiceId::new(id)), state.retry)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Billing totals over a creation-date range
pub async fn statistics(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<BillingStatistics>, ApiError> {
    let stats = state
        .service
        .statistics(&actor, params.from, params.to)
        .await?;
    Ok(Json(stats))
}
