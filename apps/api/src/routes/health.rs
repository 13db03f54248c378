use axum::Json;
use serde_json::{json, Value};

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Document management AI agent is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
