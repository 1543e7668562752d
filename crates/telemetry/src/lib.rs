//! Structured JSON logging init, shared by the `cli` binary's `main`.

#![deny(unsafe_code)]

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Initialize structured logging (JSON) with env filter.
/// Set `RUST_LOG`, e.g. `info,orchestrator=debug`.
pub fn init_json_logging() {
    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}
