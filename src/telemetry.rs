//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL holds the filter directives; when unset or invalid the
//!   `DEFAULT_FILTER` below applies.
//! - LOG_FORMAT=json switches to one JSON object per event (fields flattened);
//!   anything else keeps the human-readable format.
//!
//! Targets: `series` carries domain events (generation, compilation, grading),
//! `series_backend` carries service events. Tower HTTP's TraceLayer adds the
//! per-request spans.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,series=debug,series_backend=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        builder.json().flatten_event(true).with_current_span(true).init();
    } else {
        builder.init();
    }
    tracing::debug!(target: "series_backend", json, "Tracing initialized");
}
