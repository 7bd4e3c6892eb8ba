// Finta - Web Server
// REST API over the persisted ledger

use anyhow::{Context, Result};
use finta::api::{create_router, AppState};
use finta::{Ledger, Settings, SqliteStore};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("info,tower_http=debug")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    // Optional settings file as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;

    let classifier = settings.classifier()?;
    let store = SqliteStore::open(&settings.db_path)?;
    info!(db = %settings.db_path.display(), "Database opened");

    let ledger = Ledger::open(store, classifier);
    let state = AppState::new(ledger, settings.reader());

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;

    info!("🚀 Server running on http://{}", settings.bind);
    info!("   API: http://{}/api/transactions", settings.bind);

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
