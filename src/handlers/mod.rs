pub mod archive;
pub mod preview;
pub mod shared;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Liveness probe.
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "preview-server",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
