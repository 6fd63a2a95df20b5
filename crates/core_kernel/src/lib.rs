//! Core Kernel - Foundational types for the clinic billing ledger
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for ledger and clinic records
//! - Access control values resolved once per request
//! - Port marker traits and adapter health reporting

pub mod money;
pub mod identifiers;
pub mod access;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{
    IdentifierError, InvoiceId, LineItemId, PaymentId, PatientId, VisitId,
    ServiceItemId, UserId,
};
pub use access::{Actor, Capability, PermissionSet, Role};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable};
