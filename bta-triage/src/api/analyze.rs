//! Scan analysis endpoint
//!
//! Runs one scan file through the inference endpoint, deposits the result
//! into the upload-to-intake hand-off slot, and returns the diagnosis.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

use crate::services::AnalysisError;
use crate::AppState;
use bta_common::events::TriageEvent;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Path of the selected scan file on the local filesystem
    pub path: PathBuf,
}

fn analysis_error_response(e: &AnalysisError) -> Response {
    let status = match e {
        AnalysisError::Busy => StatusCode::CONFLICT,
        AnalysisError::NoFileSelected | AnalysisError::UnreadableFile(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Network(_) | AnalysisError::Endpoint { .. } | AnalysisError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

/// POST /api/analyze
///
/// On success the result is also deposited into the hand-off slot for the
/// intake form to adopt.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    match state.analysis.analyze(&request.path).await {
        Ok(result) => {
            state.handoff.deposit(result.clone());
            state.bus.emit_lossy(TriageEvent::AnalysisCompleted {
                label: result.label.clone(),
                confidence: result.confidence,
                timestamp: chrono::Utc::now(),
            });
            Json(json!({
                "result": result.label,
                "confidence": result.confidence,
                "image_url": result.image_ref,
            }))
            .into_response()
        }
        Err(e) => analysis_error_response(&e),
    }
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/analyze", post(analyze))
}
