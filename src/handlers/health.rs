use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::db::connection::ConnectivityCheck;

/// GET /health
/// Process liveness, no database access.
pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /api/db
/// Runs `SELECT 1` once; any other outcome is a failure.
pub async fn db_health(
    State(connectivity): State<Arc<dyn ConnectivityCheck>>,
) -> (StatusCode, Json<Value>) {
    match connectivity.select_one() {
        Ok(1) => (
            StatusCode::OK,
            Json(json!({ "message": "Database connection successful" })),
        ),
        Ok(other) => {
            tracing::error!(value = other, "Database health check returned unexpected value");
            db_failure()
        }
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            db_failure()
        }
    }
}

fn db_failure() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Database connection failed" })),
    )
}
