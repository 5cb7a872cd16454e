//! Scoped database connections.
//!
//! A connection is opened for one unit of work and closed when the work is
//! done, whether it succeeded or not.

use std::fmt::Display;

use futures_util::future::BoxFuture;
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Encode, Sqlite, SqliteConnection, Type};

use crate::db::DbError;

/// A named database that hands out one connection per unit of work.
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    url: String,
}

impl DatabaseConnection {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open a connection, run `work` on it, then close it.
    ///
    /// Errors from `work` are logged and returned to the caller.
    pub async fn scope<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, E>>,
        E: From<sqlx::Error> + Display,
    {
        let mut conn = SqliteConnection::connect(&self.url).await?;
        tracing::debug!(url = %self.url, "Connection opened");

        let result = work(&mut conn).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "An error occurred");
        }

        if let Err(err) = conn.close().await {
            tracing::warn!(url = %self.url, error = %err, "Failed to close connection");
        } else {
            tracing::debug!(url = %self.url, "Connection closed");
        }
        result
    }
}

/// Run `work` with a fresh connection to `url`.
pub async fn with_db_connection<T, E, F>(url: &str, work: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, E>>,
    E: From<sqlx::Error> + Display,
{
    DatabaseConnection::new(url).scope(work).await
}

/// A single parameterised query run on its own connection.
pub struct ExecuteQuery<P> {
    connection: DatabaseConnection,
    query: String,
    param: P,
}

impl<P> ExecuteQuery<P>
where
    P: for<'q> Encode<'q, Sqlite> + Type<Sqlite> + Send + 'static,
{
    pub fn new(url: &str, query: impl Into<String>, param: P) -> Self {
        Self {
            connection: DatabaseConnection::new(url),
            query: query.into(),
            param,
        }
    }

    /// Execute the query and return every row.
    pub async fn run(self) -> Result<Vec<SqliteRow>, DbError> {
        let ExecuteQuery {
            connection,
            query,
            param,
        } = self;

        connection
            .scope(move |conn| {
                Box::pin(async move {
                    let rows = sqlx::query(&query).bind(param).fetch_all(&mut *conn).await?;
                    tracing::debug!(query = %query, rows = rows.len(), "Query executed");
                    Ok(rows)
                })
            })
            .await
    }
}
