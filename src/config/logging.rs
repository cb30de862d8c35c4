//! Logging initialization
//!
//! # Environment Variables
//! - `LOG_FORMAT`: `pretty` (default) or `json`
//! - `RUST_LOG`: level filter (default: `info`)

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with a configurable format.
pub fn init_logging() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .pretty()
                .init();
        }
    }
}
