//! Test Utilities Crate
//!
//! Shared test infrastructure for the clinic billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: catalog items, actors and a ready-wired in-memory ledger
//! - `builders`: builder for invoice creation requests
//! - `database`: PostgreSQL testcontainer with the ledger schema applied
//! - `assertions`: assertion helpers for money and ledger invariants
//! - `generators`: proptest strategies for prices, quantities and payment splits

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
