//! bta-triage - Brain Tumor Assistant triage service
//!
//! Single-binary service: local identity, scan analysis via the external
//! inference endpoint, intake record submission, and live record browsing
//! over SSE.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use bta_common::config::{self, AnalysisEndpoint, DEFAULT_PORT};
use bta_common::db::init_database;
use bta_common::events::EventBus;
use bta_triage::identity::{IdentityContext, LocalIdentityProvider};
use bta_triage::intake::{AnalysisHandoff, IntakeController};
use bta_triage::records::RecordRepository;
use bta_triage::services::AnalysisClient;
use bta_triage::{build_router, AppState};

/// Event bus channel capacity
const EVENT_BUS_CAPACITY: usize = 1000;

#[derive(Parser, Debug)]
#[command(name = "bta-triage", version, about = "Brain Tumor Assistant triage service")]
struct Args {
    /// Root folder for the database and configuration
    #[arg(long)]
    root_folder: Option<String>,

    /// Port to listen on
    #[arg(long, env = "BTA_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Brain Tumor Assistant triage (bta-triage) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), "BTA_ROOT_FOLDER")?;
    info!("Root folder: {}", root_folder.display());

    let db_path = config::database_path(&root_folder);
    let db = init_database(&db_path).await?;
    info!("✓ Database ready at {}", db_path.display());

    let bus = EventBus::new(EVENT_BUS_CAPACITY);

    let provider = LocalIdentityProvider::new(db.clone());
    let identity = Arc::new(IdentityContext::new(provider, db.clone(), bus.clone()));

    let endpoint_url = AnalysisEndpoint::default().resolve_from_env();
    info!("Analysis endpoint: {}", endpoint_url);
    let analysis = Arc::new(AnalysisClient::new(endpoint_url)?);

    let repository = Arc::new(RecordRepository::new(db.clone(), bus.clone()));
    let handoff = Arc::new(AnalysisHandoff::new());
    let intake = Arc::new(tokio::sync::Mutex::new(IntakeController::new(
        identity.subscribe(),
        repository.clone(),
    )));

    let state = AppState {
        db,
        bus,
        identity,
        analysis,
        repository,
        handoff,
        intake,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("bta-triage listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
