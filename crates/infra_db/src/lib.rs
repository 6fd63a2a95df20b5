//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the billing ledger using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] hold the SQL and return plain row structs
//! - [`adapters`] implement the domain ports on top of the repositories
//! - [`pool`] creates the connection pool and applies the embedded migrations
//!
//! Queries are built at runtime (`sqlx::query_as` with `FromRow`), so the
//! crate compiles without a live database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/clinic")).await?;
//! run_migrations(&pool).await?;
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{PostgresCatalog, PostgresLedgerStore};
