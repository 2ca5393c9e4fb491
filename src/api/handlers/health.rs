//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::routes::AppState;
use crate::database::connection::health_check;

/// GET /health/
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database_ok = health_check(&state.pool).await.is_ok();

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "service": crate::NAME,
            "version": crate::VERSION,
            "database": if database_ok { "up" } else { "down" },
        })),
    )
}
