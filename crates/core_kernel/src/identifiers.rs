//! Strongly-typed identifiers for ledger and clinic records
//!
//! Every record in the ledger is keyed by a database-generated integer.
//! Newtype wrappers keep an invoice id from being passed where a patient id
//! is expected, and give each kind a stable human-readable form
//! (`INV-000042`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when parsing an identifier from text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid identifier '{0}'")]
    Malformed(String),

    #[error("Identifier must be positive, got {0}")]
    NotPositive(i64),
}

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a database-generated key
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying key
            pub const fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{:06}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let digits = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                let value: i64 = digits
                    .parse()
                    .map_err(|_| IdentifierError::Malformed(s.to_string()))?;
                if value <= 0 {
                    return Err(IdentifierError::NotPositive(value));
                }
                Ok(Self(value))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

// Ledger identifiers
define_id!(InvoiceId, "INV");
define_id!(LineItemId, "LIN");
define_id!(PaymentId, "PAY");

// Clinic records the ledger only refers to
define_id!(PatientId, "PAT");
define_id!(VisitId, "VIS");
define_id!(ServiceItemId, "SVC");
define_id!(UserId, "USR");
