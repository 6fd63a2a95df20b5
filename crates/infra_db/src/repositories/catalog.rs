//! Service catalog repository
//!
//! The ledger reads catalog entries; it never writes them.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_item(&self, id: i64) -> Result<Option<ServiceItemRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ServiceItemRow>(
            "SELECT id, name, unit_price, currency, is_active FROM service_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Database row for a catalog entry
#[derive(Debug, Clone, FromRow)]
pub struct ServiceItemRow {
    pub id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub is_active: bool,
}
