//! Audio analysis endpoint

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::error::ApiResult;
use crate::models::{AnalyzeRequest, AnalyzeResponse};
use crate::AppState;

/// POST /analyze-audio
///
/// Accepts an audio resource URL, classifies it (or serves the cached
/// result), and returns the acoustic metadata plus the taxonomy label.
pub async fn analyze_audio(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    info!(url = %request.audio_url, "Received analyze request");

    let result = state.pipeline.analyze(&request.audio_url).await?;

    Ok(Json(AnalyzeResponse::success(result)))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze-audio", post(analyze_audio))
}
