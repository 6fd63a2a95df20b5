//! PostgreSQL adapters for the billing ports
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresCatalog, PostgresLedgerStore};
//!
//! let service = BillingService::new(
//!     Arc::new(PostgresLedgerStore::new(pool.clone())),
//!     Arc::new(PostgresCatalog::new(pool)),
//!     policy,
//! );
//! ```

pub mod billing;
pub mod catalog;

pub use billing::PostgresLedgerStore;
pub use catalog::PostgresCatalog;
