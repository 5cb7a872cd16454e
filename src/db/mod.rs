//! Database access.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig
//!     → connect() (SqlitePool, shared by the HTTP handlers)
//!     → migrate() (embedded ./migrations)
//!
//! One-off work (CLI):
//!     connection.rs (scoped connection / single query, always closed)
//!     → transaction.rs (commit on Ok, rollback on Err)
//!     → query_log.rs (log SQL text before it runs)
//! ```

pub mod connection;
pub mod query_log;
pub mod transaction;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use connection::{with_db_connection, DatabaseConnection, ExecuteQuery};
pub use query_log::log_query;
pub use transaction::transactional;

/// Errors raised outside the request path (start-up, CLI helpers).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open the shared connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true);

    // Every connection to `:memory:` is a separate database.
    let in_memory = config.url.contains(":memory:");
    let mut pool = SqlitePoolOptions::new();
    pool = if in_memory {
        pool.max_connections(1).idle_timeout(None).max_lifetime(None)
    } else {
        pool.max_connections(config.max_connections)
    };

    let pool = pool.connect_with(options).await?;
    tracing::info!(url = %config.url, in_memory, "Database pool ready");
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Connect and, when configured, migrate.
pub async fn init(config: &DatabaseConfig) -> Result<SqlitePool, DbError> {
    let pool = connect(config).await?;
    if config.run_migrations {
        migrate(&pool).await?;
    }
    Ok(pool)
}
