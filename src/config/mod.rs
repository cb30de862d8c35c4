//! Configuration: types, YAML/env loading and logging setup

mod loader;
pub mod logging;
mod types;

pub use loader::{load_config, parse_file_config};
pub use logging::init_logging;
pub use types::{AppConfig, FileConfig, DEFAULT_SYMBOL};
