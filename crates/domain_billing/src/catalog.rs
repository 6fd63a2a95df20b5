//! Service catalog lookup
//!
//! The catalog is owned by clinic administration; the ledger only reads the
//! current price of an item when it builds an invoice line.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, Money, ServiceItemId};

use crate::error::BillingError;

/// A billable service as currently listed in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ServiceItemId,
    pub name: String,
    pub unit_price: Money,
    pub is_active: bool,
}

impl CatalogItem {
    pub fn new(id: ServiceItemId, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Active items with a non-negative price can be placed on an invoice
    pub fn is_billable(&self) -> bool {
        self.is_active && !self.unit_price.is_negative()
    }
}

/// Read access to the service catalog
#[async_trait]
pub trait CatalogPort: DomainPort {
    /// Looks up an item by id
    ///
    /// Returns `Ok(None)` when the item does not exist. Inactive items are
    /// returned with `is_active = false` so callers can log why a line was
    /// excluded.
    async fn get_item(&self, id: ServiceItemId) -> Result<Option<CatalogItem>, BillingError>;
}
