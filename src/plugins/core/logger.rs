//! Logging plugin
//!
//! Bridges log lines onto the hook bus (for display widgets) and through
//! `tracing` (for operators tailing structured output). This is a required
//! module for a host to operate.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;

/// Logging capability every other module reaches for.
#[async_trait]
pub trait LogApi: Send + Sync {
    /// Append a line to the console output area.
    async fn log_output(&self, line: &str);

    /// Clear all console output.
    async fn clear_output(&self);

    async fn log_info(&self, line: &str);
    async fn log_warn(&self, line: &str);
    async fn log_error(&self, line: &str);
    async fn log_debug(&self, line: &str);

    /// Highlighted info line for notable events (order submissions etc).
    async fn log_star(&self, line: &str);

    /// Drop the most recent debug log line; used to overwrite an in-progress
    /// line with its completion.
    async fn clear_last_debug_line(&self);
}

#[derive(Debug)]
pub struct LoggerPlugin {
    core: ModuleCore,
}

impl LoggerPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = Plugin::builder("core:logger")
            .provides_hook(hooks::LOG_OUTPUT)
            .provides_hook(hooks::LOG_OUTPUT_CLEAR)
            .provides_hook(hooks::LOG_DEBUG)
            .provides_hook(hooks::LOG_DEBUG_CLEAR_LAST)
            .async_host_methods(&[
                "log_output",
                "clear_output",
                "log_info",
                "log_warn",
                "log_error",
                "log_debug",
                "log_star",
                "clear_last_debug_line",
            ])
            .attach(host)?;

        let plugin = Arc::new(Self { core });
        host.provide::<dyn LogApi>(plugin.id(), Arc::clone(&plugin) as Arc<dyn LogApi>)?;
        Ok(plugin)
    }

    async fn debug_line(&self, line: String) {
        if let Err(error) = self.core.emit(hooks::LOG_DEBUG, HookData::Line(line)).await {
            error!(%error, "failed to propagate debug log line");
        }
    }
}

impl Module for LoggerPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl LogApi for LoggerPlugin {
    async fn log_output(&self, line: &str) {
        info!(target: "term::output", "{line}");
        if let Err(error) = self
            .core
            .emit(hooks::LOG_OUTPUT, HookData::Line(line.to_string()))
            .await
        {
            error!(%error, "failed to propagate output line");
        }
    }

    async fn clear_output(&self) {
        if let Err(error) = self.core.emit(hooks::LOG_OUTPUT_CLEAR, HookData::None).await {
            error!(%error, "failed to propagate output clear");
        }
    }

    async fn log_info(&self, line: &str) {
        info!(target: "term", "{line}");
        self.debug_line(format!("[info] {line}")).await;
    }

    async fn log_warn(&self, line: &str) {
        warn!(target: "term", "{line}");
        self.debug_line(format!("[warn] {line}")).await;
    }

    async fn log_error(&self, line: &str) {
        error!(target: "term", "{line}");
        self.debug_line(format!("[error] {line}")).await;
    }

    async fn log_debug(&self, line: &str) {
        debug!(target: "term", "{line}");
        self.debug_line(format!("[debug] {line}")).await;
    }

    async fn log_star(&self, line: &str) {
        info!(target: "term", "* {line}");
        self.debug_line(format!("[*] {line}")).await;
    }

    async fn clear_last_debug_line(&self) {
        if let Err(error) = self
            .core
            .emit(hooks::LOG_DEBUG_CLEAR_LAST, HookData::None)
            .await
        {
            error!(%error, "failed to propagate debug line clear");
        }
    }
}
