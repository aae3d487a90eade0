// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tube-Accounts API Server
//!
//! Registers users, issues session tokens and manages logout.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tube_accounts::{
    config::Config,
    db::FirestoreDb,
    services::{MediaService, SessionService, TokenSigner},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Tube-Accounts API");

    let db = if config.use_in_memory_db {
        tracing::warn!("USE_IN_MEMORY_DB is set; users will not survive a restart");
        FirestoreDb::new_mock()
    } else {
        FirestoreDb::new(&config.gcp_project_id, &config.firestore_database).await?
    };

    let media = MediaService::new(&config.media);
    tracing::info!(cloud = %config.media.cloud_name, "Media service initialized");

    let sessions = SessionService::new(db.clone(), TokenSigner::new(&config));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        media,
        sessions,
    });

    // Build router
    let app = tube_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tube_accounts=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
