use crate::server::Server;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

pub fn create_health_routes() -> Router<Server> {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "unified-inbox"
    }))
}
