//! Query logging.
//!
//! Wraps a query future so its SQL text is logged, with a timestamp, before it
//! executes, and its duration once it finishes.

use std::future::Future;
use std::time::Instant;

use chrono::Local;
use tracing::Instrument;

/// Run `query` after logging `sql`.
pub async fn log_query<F, T>(sql: &str, query: F) -> T
where
    F: Future<Output = T>,
{
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    tracing::info!(query = sql, %timestamp, "Executing query");

    let start = Instant::now();
    let output = query.instrument(tracing::debug_span!("query", sql)).await;
    tracing::debug!(
        query = sql,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Query finished"
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_output_through() {
        let out = log_query("SELECT 1", async { 41 + 1 }).await;
        assert_eq!(out, 42);
    }
}
