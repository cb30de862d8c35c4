//! Application-wide error type
//!
//! Subsystem errors convert into `AppError` at the binary boundary so the
//! bootstrap path has a single error surface.

use thiserror::Error;

use crate::exchange::errors::ExchangeError;
use crate::host::error::{BootError, ModuleAddError};
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ModuleAdd(#[from] ModuleAddError),

    #[error(transparent)]
    Boot(#[from] BootError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
