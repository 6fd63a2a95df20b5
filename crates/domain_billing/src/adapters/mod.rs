//! In-process adapters for the billing ports
//!
//! The PostgreSQL adapters live in `infra_db`; the ones here keep the whole
//! ledger in memory and back the test suites and local tooling.

mod memory;

pub use memory::{InMemoryCatalog, InMemoryLedgerStore};
