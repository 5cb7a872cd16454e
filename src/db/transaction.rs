//! Transactional unit of work.

use futures_util::future::BoxFuture;
use sqlx::{Acquire, Sqlite, SqliteConnection};

/// Run `work` inside a transaction on `db` (a pool or a connection).
///
/// The transaction is committed when `work` returns `Ok` and rolled back when
/// it returns `Err`; the error is handed back to the caller unchanged.
pub async fn transactional<'a, A, T, E, F>(db: A, work: F) -> Result<T, E>
where
    A: Acquire<'a, Database = Sqlite>,
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, E>>,
    E: From<sqlx::Error> + std::fmt::Display,
{
    let mut tx = db.begin().await?;

    match work(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Rolling back transaction");
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{connect, DbError};
    use sqlx::SqlitePool;

    async fn pool_with_table() -> SqlitePool {
        let pool = connect(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        sqlx::query("CREATE TABLE accounts (id INTEGER PRIMARY KEY, email TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO accounts (id, email) VALUES (1, 'old@example.com')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn email(pool: &SqlitePool) -> String {
        sqlx::query_scalar("SELECT email FROM accounts WHERE id = 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commits_on_ok() {
        let pool = pool_with_table().await;

        let updated = transactional(&pool, |conn| {
            Box::pin(async move {
                let result = sqlx::query("UPDATE accounts SET email = ? WHERE id = 1")
                    .bind("new@example.com")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, DbError>(result.rows_affected())
            })
        })
        .await
        .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(email(&pool).await, "new@example.com");
    }

    #[tokio::test]
    async fn test_rolls_back_on_err() {
        let pool = pool_with_table().await;

        let result: Result<(), DbError> = transactional(&pool, |conn| {
            Box::pin(async move {
                sqlx::query("UPDATE accounts SET email = ? WHERE id = 1")
                    .bind("new@example.com")
                    .execute(&mut *conn)
                    .await?;
                // Violates NOT NULL, aborting the unit of work.
                sqlx::query("INSERT INTO accounts (id, email) VALUES (2, NULL)")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(email(&pool).await, "old@example.com");
    }
}
