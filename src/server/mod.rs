//! HTTP boundary: JSON routes over the orchestrator and the example library.

pub mod api;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::CourseForgeConfig;
use crate::generation::db::{CourseDb, DbHandle};
use crate::generation::generator::AnthropicGenerator;
use crate::generation::orchestrator::Orchestrator;
use crate::generation::phase::PhaseRunner;
use crate::generation::prompts::SystemPrompts;

use api::{AppState, SharedState};

/// Build the full application router.
pub fn build_router(state: SharedState, dev_mode: bool) -> Router {
    let app = api::api_router(state.clone())
        .fallback(api::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Open the database, wire the pipeline and build the shared state.
pub fn build_state(config: &CourseForgeConfig) -> Result<SharedState> {
    let lookup = |key: &str| std::env::var(key).ok();

    // Refuse to start in production without a boundary key.
    let api_key = config.boundary_api_key(lookup)?;

    let db_path = &config.database.path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = CourseDb::new(db_path).context("Failed to initialize course database")?;

    let generator = AnthropicGenerator::new(&config.generator, config.generator_api_key(lookup))
        .context("Failed to build content generator")?;
    let prompts = SystemPrompts::load(&config.generator.prompts_dir)?;
    let runner = Arc::new(PhaseRunner::new(Arc::new(generator), prompts));

    Ok(Arc::new(AppState {
        orchestrator: Orchestrator::new(DbHandle::new(db), runner),
        api_key,
        config_status: config.status(lookup),
        environment: config.environment,
    }))
}

/// Start the HTTP server and serve until Ctrl-C.
pub async fn start_server(config: CourseForgeConfig) -> Result<()> {
    let state = build_state(&config)?;

    if !state.config_status.missing.is_empty() {
        warn!(
            missing = %state.config_status.missing.join(", "),
            "Missing configuration"
        );
    }

    let app = build_router(state, config.server.dev);

    let addr = format!("{}:{}", config.bind_host(), config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        address = %local_addr,
        environment = %config.environment,
        database = %config.database.path.display(),
        "course-forge API listening"
    );
    println!("course-forge API running at http://{}", local_addr);
    println!("Health check: http://{}/health", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
