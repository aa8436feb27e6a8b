//! Codeforge · practice backend
//!
//! - Axum HTTP API (submit, analyze, generate, weakness, evaluate, ...)
//! - Piston-style execution service for running learner code
//! - Optional OpenAI-compatible oracle (via environment variables)
//! - Supabase REST store, or an in-memory store when not configured
//!
//! Important env variables:
//!   PORT                  : u16 (default 5000)
//!   PISTON_URL            : execution endpoint (default public Piston)
//!   ORACLE_API_KEY        : enables analysis and generation if present
//!   ORACLE_BASE_URL       : default "https://api.together.xyz/v1"
//!   ORACLE_MODEL          : default "deepseek-ai/DeepSeek-V3"
//!   SUPABASE_URL/KEY      : persistent store
//!   AGENT_CONFIG_PATH     : path to TOML config (prompts + tuning)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use codeforge_backend::config::Settings;
use codeforge_backend::routes::build_router;
use codeforge_backend::state::AppState;
use codeforge_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; real environment variables win.
    let dotenv = dotenvy::dotenv();
    telemetry::init_tracing();
    if let Ok(path) = dotenv {
        info!(target: "codeforge", path = %path.display(), "Loaded .env");
    }

    let settings = Settings::from_env();
    let state = Arc::new(AppState::from_settings(&settings)?);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;
    info!(target: "codeforge", %addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(target: "codeforge", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "codeforge", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: "codeforge", "Shutdown signal received");
}
