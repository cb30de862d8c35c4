//! Utilities plugin
//!
//! Shared helpers on the host, most notably standardized operation duration
//! logging. This is a required module for a host to operate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;

/// In-flight duration measurement started by `UtilitiesApi::log_duration`.
///
/// `finish` overwrites the start line with a completion line carrying the
/// elapsed time.
pub struct OpTimer {
    label: String,
    started: Instant,
    log: Arc<dyn LogApi>,
}

impl OpTimer {
    pub async fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        self.log.clear_last_debug_line().await;
        self.log
            .log_info(&format!("done: {} ({}ms)", self.label, elapsed.as_millis()))
            .await;
        elapsed
    }
}

#[async_trait]
pub trait UtilitiesApi: Send + Sync {
    /// Log the start of an operation and return a timer to complete it:
    ///
    /// ```ignore
    /// let timer = utilities.log_duration("margin info fetch").await;
    /// let info = rest.margin_info().await?;
    /// timer.finish().await;
    /// ```
    async fn log_duration(&self, label: &str) -> OpTimer;
}

pub struct UtilitiesPlugin {
    core: ModuleCore,
    log: Arc<dyn LogApi>,
}

impl UtilitiesPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = Plugin::builder("core:utilities")
            .requires_module("plugin:core:logger")
            .async_host_methods(&["log_duration"])
            .attach(host)?;

        let log = host.capability::<dyn LogApi>()?;

        let plugin = Arc::new(Self { core, log });
        host.provide::<dyn UtilitiesApi>(plugin.id(), Arc::clone(&plugin) as Arc<dyn UtilitiesApi>)?;
        Ok(plugin)
    }
}

impl Module for UtilitiesPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl UtilitiesApi for UtilitiesPlugin {
    async fn log_duration(&self, label: &str) -> OpTimer {
        self.log.log_info(&format!("started: {label}")).await;

        OpTimer {
            label: label.to_string(),
            started: Instant::now(),
            log: Arc::clone(&self.log),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::hooks::{self, HookData};
    use crate::host::module::ModuleBuilder;
    use crate::plugins::core::logger::LoggerPlugin;
    use crate::util::lock;
    use std::sync::Mutex;

    struct Probe {
        core: ModuleCore,
    }

    impl Module for Probe {
        fn core(&self) -> &ModuleCore {
            &self.core
        }
    }

    #[tokio::test]
    async fn test_utilities_requires_logger_capability() {
        let host = ModuleHost::new("tBTCUSD");
        assert!(host.add_module(UtilitiesPlugin::build).is_err());
    }

    #[tokio::test]
    async fn test_duration_logging_overwrites_start_line() {
        let host = ModuleHost::new("tBTCUSD");
        let events = Arc::new(Mutex::new(Vec::new()));

        for hook in [hooks::LOG_DEBUG, hooks::LOG_DEBUG_CLEAR_LAST] {
            let sink = Arc::clone(&events);
            host.add_module(move |h| {
                Ok(Arc::new(Probe {
                    core: ModuleBuilder::new(format!("widget:probe-{hook}"))
                        .on(hook, move |data| {
                            let sink = Arc::clone(&sink);
                            Box::pin(async move {
                                match data {
                                    HookData::Line(line) => lock(&sink).push(line),
                                    HookData::None => lock(&sink).push("<clear-last>".into()),
                                    _ => {}
                                }
                                Ok(())
                            })
                        })
                        .attach(h)?,
                }))
            })
            .unwrap();
        }

        host.add_module(LoggerPlugin::build).unwrap();
        let utilities = host.add_module(UtilitiesPlugin::build).unwrap();

        let timer = utilities.log_duration("ws connect").await;
        let elapsed = timer.finish().await;

        let events = lock(&events).clone();
        assert_eq!(events[0], "[info] started: ws connect");
        assert_eq!(events[1], "<clear-last>");
        assert!(
            events[2].starts_with("[info] done: ws connect ("),
            "got: {}",
            events[2]
        );
        assert!(elapsed.as_millis() < 1_000);
    }
}
