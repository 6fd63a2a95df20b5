//! HTTP tests for the billing API over in-memory adapters

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::{Actor, InvoiceId};
use domain_billing::{InvoiceDetail, InvoicePage, PaymentOutcome, PaymentStatus};
use interface_api::{auth::create_token, config::ApiConfig, create_router};
use test_utils::{ActorFixtures, CatalogFixtures, IdFixtures, TestLedger};

const SECRET: &str = "api-test-secret";

struct Harness {
    server: TestServer,
    ledger: TestLedger,
}

impl Harness {
    fn new() -> Self {
        let ledger = TestLedger::new();
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..Default::default()
        };
        let server = TestServer::new(create_router(ledger.service.clone(), config)).unwrap();
        Self { server, ledger }
    }

    fn as_actor(request: TestRequest, actor: &Actor) -> TestRequest {
        let token = create_token(actor.user_id, actor.role, SECRET, 3600).unwrap();
        request.add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }

    async fn create_standard_invoice(&self) -> InvoiceId {
        let response = Self::as_actor(self.server.post("/api/v1/invoices"), &ActorFixtures::billing_clerk())
            .json(&json!({
                "patient_id": IdFixtures::patient(),
                "items": [
                    { "service_item_id": CatalogFixtures::CONSULTATION, "quantity": 1 },
                    { "service_item_id": CatalogFixtures::CBC, "quantity": 2 }
                ]
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        InvoiceId::new(body["id"].as_i64().unwrap())
    }

    async fn pay(&self, id: InvoiceId, body: Value) -> axum_test::TestResponse {
        Self::as_actor(
            self.server.post(&format!("/api/v1/invoices/{}/payments", id.value())),
            &ActorFixtures::cashier(),
        )
        .json(&body)
        .await
    }
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let h = Harness::new();
        let response = h.server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_follows_ledger_store() {
        let h = Harness::new();
        assert_eq!(h.server.get("/health/ready").await.status_code(), StatusCode::OK);

        h.ledger.store.set_unavailable(true);
        let response = h.server.get("/health/ready").await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["ledger"]["status"], "unhealthy");
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = Harness::new();
        let response = h.server.get("/api/v1/invoices").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized_on_every_route() {
        let h = Harness::new();
        for path in ["/api/v1/invoices", "/api/v1/invoices/1", "/api/v1/billing/statistics"] {
            let response = h
                .server
                .get(path)
                .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"))
                .await;
            assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{}", path);
            let body: Value = response.json();
            assert_eq!(body["error"], "unauthorized");
        }
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let h = Harness::new();
        let actor = ActorFixtures::admin();
        let token = create_token(actor.user_id, actor.role, "someone-else", 3600).unwrap();
        let response = h
            .server
            .get("/api/v1/invoices")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_receptionist_cannot_take_payments() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;

        let response = Harness::as_actor(
            h.server.post(&format!("/api/v1/invoices/{}/payments", id.value())),
            &ActorFixtures::receptionist(),
        )
        .json(&json!({ "amount_tendered": "100.00" }))
        .await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(h.ledger.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_doctor_cannot_list_invoices() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.get("/api/v1/invoices"), &ActorFixtures::doctor()).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }
}

mod invoice_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_fetch_invoice() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;

        let response = Harness::as_actor(
            h.server.get(&format!("/api/v1/invoices/{}", id.value())),
            &ActorFixtures::receptionist(),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let detail: InvoiceDetail = response.json();
        assert_eq!(detail.invoice.total_amount.amount(), dec!(500.00));
        assert_eq!(detail.invoice.payment_status, PaymentStatus::Unpaid);
        assert_eq!(detail.line_items.len(), 2);
        assert!(detail.payments.is_empty());
    }

    #[tokio::test]
    async fn test_client_supplied_prices_are_ignored() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.post("/api/v1/invoices"), &ActorFixtures::billing_clerk())
            .json(&json!({
                "patient_id": IdFixtures::patient(),
                "items": [{ "service_item_id": CatalogFixtures::XRAY, "quantity": 1, "unit_price": "1.00" }]
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let id = InvoiceId::new(response.json::<Value>()["id"].as_i64().unwrap());

        let detail = h
            .ledger
            .service
            .get_invoice_detail(&ActorFixtures::admin(), id)
            .await
            .unwrap();
        assert_eq!(detail.line_items[0].unit_price.amount(), dec!(450.00));
    }

    #[tokio::test]
    async fn test_missing_patient_is_unprocessable() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.post("/api/v1/invoices"), &ActorFixtures::billing_clerk())
            .json(&json!({
                "items": [{ "service_item_id": CatalogFixtures::CONSULTATION, "quantity": 1 }]
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.ledger.store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_items_reports_no_items() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.post("/api/v1/invoices"), &ActorFixtures::billing_clerk())
            .json(&json!({ "patient_id": IdFixtures::patient(), "items": [] }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "no items");
    }

    #[tokio::test]
    async fn test_oversized_quantity_reports_field_details() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.post("/api/v1/invoices"), &ActorFixtures::billing_clerk())
            .json(&json!({
                "patient_id": IdFixtures::patient(),
                "items": [{ "service_item_id": CatalogFixtures::CONSULTATION, "quantity": 3_000_000_000_i64 }]
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");
        assert!(body["details"][0].as_str().unwrap().starts_with("items"));
        assert_eq!(h.ledger.store.invoice_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_invoice_is_not_found() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.get("/api/v1/invoices/424242"), &ActorFixtures::admin()).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let h = Harness::new();
        let paid = h.create_standard_invoice().await;
        h.create_standard_invoice().await;
        h.pay(paid, json!({ "amount_tendered": "500.00" })).await;

        let response = Harness::as_actor(h.server.get("/api/v1/invoices"), &ActorFixtures::receptionist())
            .add_query_param("status", "unpaid")
            .add_query_param("page_size", 10)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let page: InvoicePage = response.json();
        assert_eq!(page.total, 1);
        assert_eq!(page.page_size, 10);
        assert!(page.items.iter().all(|s| s.payment_status == PaymentStatus::Unpaid));
        assert_ne!(page.items[0].id, paid);
    }
}

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_cash_overpayment_returns_change() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;

        let response = h.pay(id, json!({ "amount_tendered": "200.00" })).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let first: PaymentOutcome = response.json();
        assert_eq!(first.new_status, PaymentStatus::Partial);
        assert_eq!(first.remaining_balance.amount(), dec!(300.00));

        let second: PaymentOutcome = h.pay(id, json!({ "amount_tendered": "1000.00" })).await.json();
        assert_eq!(second.amount_applied.amount(), dec!(300.00));
        assert_eq!(second.change_amount.amount(), dec!(700.00));
        assert_eq!(second.new_status, PaymentStatus::Paid);
        assert_ne!(first.receipt_number, second.receipt_number);
    }

    #[tokio::test]
    async fn test_paid_invoice_is_conflict() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;
        h.pay(id, json!({ "amount_tendered": "500.00" })).await;

        let response = h.pay(id, json!({ "amount_tendered": "10.00" })).await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_card_overpayment_is_unprocessable() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;

        let response = h
            .pay(id, json!({ "amount_tendered": "600.00", "method": "card" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.ledger.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_positive_tender_is_unprocessable() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;

        let response = h.pay(id, json!({ "amount_tendered": "-5.00" })).await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_payment_on_missing_invoice_is_not_found() {
        let h = Harness::new();
        let response = h.pay(InvoiceId::new(9999), json!({ "amount_tendered": "5.00" })).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}

mod statistics_tests {
    use super::*;
    use chrono::Utc;
    use domain_billing::BillingStatistics;

    #[tokio::test]
    async fn test_statistics_for_today() {
        let h = Harness::new();
        let id = h.create_standard_invoice().await;
        h.pay(id, json!({ "amount_tendered": "120.00" })).await;

        let today = Utc::now().date_naive().to_string();
        let response = Harness::as_actor(h.server.get("/api/v1/billing/statistics"), &ActorFixtures::billing_clerk())
            .add_query_param("from", &today)
            .add_query_param("to", &today)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let stats: BillingStatistics = response.json();
        assert_eq!(stats.partial_count, 1);
        assert_eq!(stats.total_collected, dec!(120.00));
        assert_eq!(stats.outstanding, dec!(380.00));
    }

    #[tokio::test]
    async fn test_inverted_range_is_unprocessable() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.get("/api/v1/billing/statistics"), &ActorFixtures::admin())
            .add_query_param("from", "2026-02-01")
            .add_query_param("to", "2026-01-01")
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_cashier_cannot_view_statistics() {
        let h = Harness::new();
        let response = Harness::as_actor(h.server.get("/api/v1/billing/statistics"), &ActorFixtures::cashier())
            .add_query_param("from", "2026-01-01")
            .add_query_param("to", "2026-01-31")
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }
}
