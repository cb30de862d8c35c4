//! tradeterm — interactive terminal trading client
//!
//! A thin orchestration layer over an exchange SDK, built around a
//! dependency-validated plugin host:
//! - `host`: module/plugin base, hook bus, capability registry, boot
//! - `settings`: typed runtime setting registry with change notification
//! - `plugins`: data feeds, derived data, alerting, notifications
//! - `commands`: typed console commands calling host capabilities
//! - `exchange`: vendor SDK boundary (traits + value types + sim doubles)

pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod exchange;
pub mod format;
pub mod host;
pub mod plugins;
pub mod settings;
pub mod util;

pub use error::AppError;
