//! Record submission and browsing endpoints
//!
//! Submit runs the intake controller's full contract against the current
//! session and the hand-off slot. The stream endpoint exposes the live
//! owner-scoped subscription over SSE, with the browser filter applied
//! server-side from query parameters.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{self, FilterCriteria};
use crate::intake::{IntakeForm, SubmitError};
use crate::records::StoreError;
use crate::AppState;
use bta_common::db::models::IntakeRecord;

fn submit_error_response(e: SubmitError) -> Response {
    match e {
        SubmitError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        // The client should route back to the upload step
        SubmitError::MissingAnalysis => (
            StatusCode::CONFLICT,
            Json(json!({ "error": e.to_string(), "redirect": "/upload" })),
        )
            .into_response(),
        SubmitError::Busy => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        SubmitError::Store(StoreError::PermissionDenied(_)) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        SubmitError::Store(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// POST /api/records
///
/// Accepts the full form state, adopts any pending analysis result from
/// the hand-off slot, and submits. The form payload replaces the
/// controller's state wholesale.
pub async fn submit_record(
    State(state): State<AppState>,
    Json(form): Json<IntakeForm>,
) -> Response {
    let mut controller = state.intake.lock().await;
    controller.set_form(form);
    controller.adopt_from(&state.handoff);

    match controller.submit().await {
        Ok(record_id) => {
            info!(record_id = %record_id, "Record submitted");
            (
                StatusCode::CREATED,
                Json(json!({
                    "record_id": record_id,
                    "message": "Test data submitted successfully",
                })),
            )
                .into_response()
        }
        Err(e) => submit_error_response(e),
    }
}

/// GET /api/records
///
/// One-shot filtered snapshot of the signed-in owner's records, newest
/// first.
pub async fn list_records(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> Response {
    let Some(session) = state.identity.current() else {
        return unauthenticated_response();
    };

    match state.repository.records_for_owner(&session.principal.id).await {
        Ok(snapshot) => {
            let filtered: Vec<&IntakeRecord> = snapshot
                .iter()
                .filter(|r| browser::matches(r, &criteria))
                .collect();
            Json(json!({ "records": filtered })).into_response()
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /api/records/stream
///
/// SSE stream of complete filtered snapshots for the signed-in owner. A
/// fresh snapshot is emitted after every append; a store failure emits one
/// error event and ends the stream, and the client must reconnect to
/// resume.
pub async fn record_stream(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> Response {
    let Some(session) = state.identity.current() else {
        return unauthenticated_response();
    };
    let owner_id = session.principal.id;
    info!(owner_id = %owner_id, "Record stream opened");

    let mut subscription = state.repository.subscribe(&owner_id);

    let stream = async_stream::stream! {
        while let Some(delivery) = subscription.next_snapshot().await {
            match delivery {
                Ok(snapshot) => {
                    let filtered: Vec<&IntakeRecord> = snapshot
                        .iter()
                        .filter(|r| browser::matches(r, &criteria))
                        .collect();
                    match Event::default().event("RecordsSnapshot").json_data(&filtered) {
                        Ok(event) => yield Ok::<_, Infallible>(event),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode records snapshot");
                        }
                    }
                }
                Err(e) => {
                    yield Ok(Event::default().event("StreamError").data(e.to_string()));
                    break;
                }
            }
        }
    };

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("heartbeat"),
        )
        .into_response()
}

fn unauthenticated_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "You must be logged in to view records" })),
    )
        .into_response()
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/api/records", post(submit_record).get(list_records))
        .route("/api/records/stream", get(record_stream))
}
