//! Access control values
//!
//! A caller's role is resolved once at the request boundary into a
//! [`PermissionSet`]. Ledger operations receive the resulting [`Actor`]
//! explicitly and check a single [`Capability`] instead of consulting
//! ambient session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identifiers::UserId;

/// Staff roles known to the clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cashier,
    BillingClerk,
    Receptionist,
    Doctor,
    Nurse,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
            Role::BillingClerk => "billing_clerk",
            Role::Receptionist => "receptionist",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
        }
    }

    /// Resolves the capabilities granted to this role
    pub fn permissions(&self) -> PermissionSet {
        use Capability::*;
        match self {
            Role::Admin => PermissionSet::all(),
            Role::Cashier => PermissionSet::of(&[CreateInvoice, ApplyPayment, ViewInvoices]),
            Role::BillingClerk => {
                PermissionSet::of(&[CreateInvoice, ViewInvoices, ViewStatistics])
            }
            Role::Receptionist => PermissionSet::of(&[ViewInvoices]),
            Role::Doctor | Role::Nurse => PermissionSet::empty(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            "billing_clerk" => Ok(Role::BillingClerk),
            "receptionist" => Ok(Role::Receptionist),
            "doctor" => Ok(Role::Doctor),
            "nurse" => Ok(Role::Nurse),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Operations on the billing ledger that require permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateInvoice,
    ApplyPayment,
    ViewInvoices,
    ViewStatistics,
}

impl Capability {
    const ALL: [Capability; 4] = [
        Capability::CreateInvoice,
        Capability::ApplyPayment,
        Capability::ViewInvoices,
        Capability::ViewStatistics,
    ];

    fn bit(self) -> u8 {
        match self {
            Capability::CreateInvoice => 1 << 0,
            Capability::ApplyPayment => 1 << 1,
            Capability::ViewInvoices => 1 << 2,
            Capability::ViewStatistics => 1 << 3,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::CreateInvoice => "invoice:create",
            Capability::ApplyPayment => "payment:apply",
            Capability::ViewInvoices => "invoice:read",
            Capability::ViewStatistics => "billing:statistics",
        };
        f.write_str(name)
    }
}

/// A fixed set of capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::of(&Capability::ALL)
    }

    pub fn of(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |bits, c| bits | c.bit()))
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Lists the capabilities in this set
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

/// The authenticated staff member performing an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl Actor {
    /// Creates an actor whose permissions are resolved from the role
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            permissions: role.permissions(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.permissions.contains(capability)
    }
}
