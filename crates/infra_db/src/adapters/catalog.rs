//! PostgreSQL catalog lookup

use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;

use core_kernel::{Currency, DomainPort, Money, ServiceItemId};
use domain_billing::{BillingError, CatalogItem, CatalogPort};

use crate::error::DatabaseError;
use crate::repositories::catalog::{CatalogRepository, ServiceItemRow};

/// Reads prices from the `service_items` table
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    repository: CatalogRepository,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CatalogRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresCatalog {}

#[async_trait]
impl CatalogPort for PostgresCatalog {
    async fn get_item(&self, id: ServiceItemId) -> Result<Option<CatalogItem>, BillingError> {
        match self.repository.find_item(id.value()).await? {
            Some(row) => Ok(Some(row_to_item(row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_item(row: ServiceItemRow) -> Result<CatalogItem, DatabaseError> {
    let currency =
        Currency::from_str(&row.currency).map_err(|e| DatabaseError::CorruptRow(e.to_string()))?;

    Ok(CatalogItem {
        id: ServiceItemId::new(row.id),
        name: row.name,
        unit_price: Money::new(row.unit_price, currency),
        is_active: row.is_active,
    })
}
