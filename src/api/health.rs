use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

pub async fn health(State(db): State<SqlitePool>) -> Json<HealthStatus> {
    let database = match sqlx::query("SELECT 1").execute(&db).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Health check query failed");
            "unavailable"
        }
    };

    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
