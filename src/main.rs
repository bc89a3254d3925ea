//! Series Trainer · convergence exercise backend
//!
//! - Generates randomized infinite-series problems per topic
//! - Compiles each problem into ordered, gradeable steps
//! - Checks learner answers symbolically and tracks attempt progress
//! - Axum HTTP + WebSocket API; all state lives with the caller
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   SERIES_CONFIG_PATH  : path to TOML config (generation knobs + step weights)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod rational;
mod symbolic;
mod error;
mod domain;
mod config;
mod generators;
mod registry;
mod compiler;
mod verifier;
mod progress;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Registry + config; nothing per-learner is kept in process.
  let state = Arc::new(AppState::new());

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "series_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "series_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!(target: "series_backend", "Ctrl-C received; shutting down"),
    Err(e) => {
      tracing::error!(target: "series_backend", error = %e, "Failed to listen for Ctrl-C; running until killed");
      std::future::pending::<()>().await
    }
  }
}
