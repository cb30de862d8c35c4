//! Configuration loading: optional YAML file + environment overrides

use std::path::Path;

use crate::config::types::{AppConfig, FileConfig, DEFAULT_SYMBOL};
use crate::error::AppError;

/// Load configuration from an optional YAML file, then apply environment
/// overrides (`TERM_SYMBOL`, `TERM_API_KEY`, `TERM_API_SECRET`).
pub fn load_config(path: &Path) -> Result<AppConfig, AppError> {
    let file = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        parse_file_config(&raw)?
    } else {
        FileConfig::default()
    };

    Ok(resolve(file))
}

/// Parse a YAML config document; used directly by tests.
pub fn parse_file_config(raw: &str) -> Result<FileConfig, AppError> {
    serde_yaml::from_str(raw).map_err(|e| AppError::Config(format!("invalid config file: {e}")))
}

fn resolve(file: FileConfig) -> AppConfig {
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    AppConfig {
        symbol: env("TERM_SYMBOL")
            .or(file.symbol)
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        api_key: env("TERM_API_KEY").or(file.api_key),
        api_secret: env("TERM_API_SECRET").or(file.api_secret),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_file_config() {
        let config = parse_file_config("symbol: tETHUSD\napi_key: k\n").unwrap();
        assert_eq!(config.symbol.as_deref(), Some("tETHUSD"));
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert!(config.api_secret.is_none());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(parse_file_config("symbol: [unterminated").is_err());
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key: abc").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.symbol, DEFAULT_SYMBOL);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(config.symbol, DEFAULT_SYMBOL);
    }
}
