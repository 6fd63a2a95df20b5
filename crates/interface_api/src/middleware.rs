//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

use core_kernel::Actor;

use crate::auth::{bearer_token, validate_token};
use crate::error::ApiError;
use crate::AppState;

/// Authentication middleware
///
/// Validates the bearer token and stores the resolved [`Actor`] in the
/// request extensions. The actor is copied onto the response so the audit
/// layer wrapping this one can attribute the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let actor = bearer_token(header)
        .and_then(|token| validate_token(token, &state.config.jwt_secret))
        .and_then(|claims| claims.actor())
        .map_err(|e| {
            warn!(error = %e, uri = %request.uri(), "Rejected request");
            e
        })?;

    request.extensions_mut().insert(actor.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(actor);
    Ok(response)
}

/// Audit logging middleware
///
/// One line per API request with the acting user and outcome, including
/// requests rejected by authentication.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    let (user, role) = audit_identity(&response);

    info!(
        method = %method,
        uri = %uri,
        user,
        role,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "API request"
    );

    response
}

/// User id and role recorded for a response; unauthenticated requests are anonymous
pub fn audit_identity(response: &Response) -> (i64, &'static str) {
    response
        .extensions()
        .get::<Actor>()
        .map(|a| (a.user_id.value(), a.role.as_str()))
        .unwrap_or((0, "anonymous"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use test_utils::{ActorFixtures, TestLedger};

    use crate::auth::create_token;
    use crate::config::ApiConfig;
    use crate::create_router;

    const SECRET: &str = "middleware-secret";

    fn router() -> axum::Router {
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..Default::default()
        };
        create_router(TestLedger::new().service, config)
    }

    #[tokio::test]
    async fn test_rejected_request_is_audited_as_anonymous() {
        let response = router()
            .oneshot(Request::get("/api/v1/invoices").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(audit_identity(&response), (0, "anonymous"));
    }

    #[tokio::test]
    async fn test_authenticated_request_is_audited_with_actor() {
        let cashier = ActorFixtures::cashier();
        let token = create_token(cashier.user_id, cashier.role, SECRET, 3600).unwrap();
        let response = router()
            .oneshot(
                Request::get("/api/v1/invoices")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(audit_identity(&response), (cashier.user_id.value(), cashier.role.as_str()));
    }
}
