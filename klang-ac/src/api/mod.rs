//! HTTP API handlers for klang-ac

pub mod analyze;
pub mod health;

use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

pub use analyze::analyze_routes;
pub use health::health_routes;

/// GET /
///
/// Service banner pointing at the analysis endpoint.
async fn service_root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "klang audio classification service. POST to /analyze-audio."
    }))
}

/// Build root routes
pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(service_root))
}
