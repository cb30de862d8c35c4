//! Configuration types

use serde::Deserialize;

/// Default market symbol when none is configured
pub const DEFAULT_SYMBOL: &str = "tBTCUSD";

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Active market symbol, e.g. `tBTCUSD`
    pub symbol: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl AppConfig {
    /// True when both credentials are present; without them the client can
    /// only consume public channels.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

/// Shape of the optional `config.yaml` file; every field may be overridden
/// by environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub symbol: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}
