//! Ports and Adapters Infrastructure
//!
//! Domain crates define their port traits on top of the marker traits here.
//! Adapters (PostgreSQL, in-memory) implement those ports and report their
//! health through [`HealthCheckable`].
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait LedgerStore: DomainPort + HealthCheckable {
//!     async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, BillingError>;
//! }
//!
//! impl LedgerStore for PostgresLedgerStore { ... }
//! impl LedgerStore for InMemoryLedgerStore { ... }
//! ```

use serde::{Deserialize, Serialize};

/// Marker trait for all domain ports
///
/// All port traits should extend this marker to ensure they are
/// thread-safe and can be used in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    /// Adapter is healthy and operational
    Healthy,
    /// Adapter is degraded but operational
    Degraded,
    /// Adapter is unhealthy and not operational
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Adapter identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    /// A healthy result measured now
    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }

    /// An unhealthy result with the failure reason
    pub fn unhealthy(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(message.into()),
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn is_operational(&self) -> bool {
        matches!(self.status, AdapterHealth::Healthy | AdapterHealth::Degraded)
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the adapter
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_result_constructors() {
        let ok = HealthCheckResult::healthy("postgres", 3);
        assert!(ok.is_operational());
        assert!(ok.message.is_none());

        let down = HealthCheckResult::unhealthy("postgres", 30_000, "pool timed out");
        assert!(!down.is_operational());
        assert_eq!(down.message.as_deref(), Some("pool timed out"));
    }
}
