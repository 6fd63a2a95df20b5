//! Database Test Utilities
//!
//! Starts a PostgreSQL testcontainer, applies the ledger schema and seeds the
//! standard service catalog.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

use crate::fixtures::CatalogFixtures;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "clinic_billing_test";

const LEDGER_SCHEMA: &str = include_str!("../../../migrations/20260101000001_billing_ledger.sql");

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A PostgreSQL test container with the ledger schema applied
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new container, applies the schema and seeds the catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the schema fails
    /// to apply
    pub async fn new() -> Result<Self, BoxError> {
        let container = Postgres::default()
            .with_db_name(POSTGRES_DB)
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..Default::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        let test_db = Self {
            _container: container,
            config,
            pool,
        };

        sqlx::raw_sql(LEDGER_SCHEMA).execute(&test_db.pool).await?;
        test_db.seed_catalog().await?;

        Ok(test_db)
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts the standard catalog with fixed ids
    async fn seed_catalog(&self) -> Result<(), BoxError> {
        for item in CatalogFixtures::standard() {
            sqlx::query(
                "INSERT INTO service_items (id, name, unit_price, currency, is_active) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.value())
            .bind(&item.name)
            .bind(item.unit_price.amount())
            .bind(item.unit_price.currency().code())
            .bind(item.is_active)
            .execute(&self.pool)
            .await?;
        }
        sqlx::query("SELECT setval('service_items_id_seq', (SELECT MAX(id) FROM service_items))")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clears ledger data while keeping the schema and the catalog
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        sqlx::query("TRUNCATE TABLE payments, invoice_line_items, invoices RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Creates an isolated test database for a single test
///
/// Each call starts its own container, so tests can run in parallel.
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::new().await
}
