//! klang-ac library interface
//!
//! Exposes the application state, router construction, and the service
//! modules for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod workers;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::services::AnalysisPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The classification pipeline (collaborators + strategy)
    pub pipeline: Arc<AnalysisPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            pipeline,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::root_routes())
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
