//! Repository implementations
//!
//! Repositories own the SQL and map rows to plain row structs. Conversion to
//! domain types happens in the adapters.

pub mod billing;
pub mod catalog;

pub use billing::BillingRepository;
pub use catalog::CatalogRepository;
