//! bta-triage library - Brain Tumor Assistant triage service
//!
//! Record lifecycle for the clinical imaging triage tool: identity and
//! session state, scan analysis against the inference endpoint, intake
//! form submission, and live owner-scoped record browsing.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod browser;
pub mod identity;
pub mod intake;
pub mod records;
pub mod services;

use identity::{IdentityContext, LocalIdentityProvider};
use intake::{AnalysisHandoff, IntakeController};
use records::RecordRepository;
use services::AnalysisClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Process-wide event bus
    pub bus: bta_common::events::EventBus,
    /// Session state and authentication
    pub identity: Arc<IdentityContext<LocalIdentityProvider>>,
    /// Client for the tumor-prediction endpoint
    pub analysis: Arc<AnalysisClient>,
    /// Append-only record store
    pub repository: Arc<RecordRepository>,
    /// One-shot upload-to-intake hand-off slot
    pub handoff: Arc<AnalysisHandoff>,
    /// The single intake form instance; one in-flight submission at a time
    pub intake: Arc<tokio::sync::Mutex<IntakeController>>,
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::analyze_routes())
        .merge(api::record_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
