//! Exchange stream connection plugin
//!
//! Opens and authenticates the market stream on host boot and provides the
//! lifecycle hooks (`ws:opened`, `ws:authenticated`, ...) other modules use
//! to begin subscribing to channels. Also drives the periodic margin and
//! position calc requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::exchange::stream::MarketStream;
use crate::host::error::{ErrorEvent, ModuleAddError};
use crate::host::hooks::{self, HookData};
use crate::host::id::ModuleId;
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::utilities::UtilitiesApi;
use crate::plugins::spawn_emit;

/// Aggressive, margin/position data drives the position display.
const CALC_REQ_INTERVAL: Duration = Duration::from_secs(5);

/// Access to the underlying market stream for channel subscriptions.
pub trait ConnectionApi: Send + Sync {
    fn stream(&self) -> Arc<dyn MarketStream>;
}

pub struct ConnectionPlugin {
    core: ModuleCore,
    stream: Arc<dyn MarketStream>,
}

impl ConnectionPlugin {
    pub fn build(
        host: &Arc<ModuleHost>,
        stream: Arc<dyn MarketStream>,
    ) -> Result<Arc<Self>, ModuleAddError> {
        let opened = Arc::new(AtomicBool::new(false));
        let boot_stream = Arc::clone(&stream);
        let weak = Arc::downgrade(host);

        let core = Plugin::builder("ws:connection")
            .requires_module("plugin:core:logger")
            .provides_hook(hooks::WS_OPENED)
            .provides_hook(hooks::WS_AUTHENTICATED)
            .provides_hook(hooks::WS_CLOSED)
            .provides_hook(hooks::WS_ERROR)
            .on(hooks::HOST_BOOT_STARTED, move |_| {
                let stream = Arc::clone(&boot_stream);
                let weak = weak.clone();
                let opened = Arc::clone(&opened);

                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;

                    if opened.swap(true, Ordering::SeqCst) {
                        bail!("market stream initialized prior to host boot");
                    }

                    let id = ModuleId::parse("plugin:ws:connection").map_err(anyhow::Error::new)?;

                    {
                        let weak = weak.clone();
                        let id = id.clone();
                        stream.on_error(Box::new(move |message| {
                            spawn_emit(
                                &weak,
                                hooks::WS_ERROR,
                                HookData::Error(ErrorEvent::Module {
                                    module: id.clone(),
                                    message,
                                }),
                            );
                        }));
                    }

                    {
                        let weak = weak.clone();
                        stream.on_close(Box::new(move || {
                            spawn_emit(&weak, hooks::WS_CLOSED, HookData::None);
                        }));
                    }

                    let utilities = host.capability::<dyn UtilitiesApi>()?;

                    let timer = utilities.log_duration("ws connect").await;
                    stream.open().await?;
                    timer.finish().await;
                    host.emit(hooks::WS_OPENED, HookData::None).await;

                    let timer = utilities.log_duration("ws auth").await;
                    stream.auth().await?;
                    timer.finish().await;
                    host.emit(hooks::WS_AUTHENTICATED, HookData::None).await;

                    let symbol = host.symbol().to_string();
                    let calc_stream = Arc::clone(&stream);
                    tokio::spawn(async move {
                        let mut interval = tokio::time::interval(CALC_REQ_INTERVAL);
                        interval.tick().await; // immediate first tick

                        loop {
                            interval.tick().await;
                            if !calc_stream.is_open() {
                                break;
                            }

                            calc_stream.request_calc(&[
                                "margin_base".to_string(),
                                format!("margin_sym_{symbol}"),
                                format!("position_{symbol}"),
                            ]);
                        }
                    });

                    Ok(())
                })
            })
            .attach(host)?;

        let plugin = Arc::new(Self { core, stream });
        host.provide::<dyn ConnectionApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn ConnectionApi>,
        )?;
        Ok(plugin)
    }
}

impl Module for ConnectionPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

impl ConnectionApi for ConnectionPlugin {
    fn stream(&self) -> Arc<dyn MarketStream> {
        Arc::clone(&self.stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::sim::SimStream;
    use crate::host::module::ModuleBuilder;
    use crate::plugins::core::logger::LoggerPlugin;
    use crate::plugins::core::utilities::UtilitiesPlugin;
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

    async fn connection_host() -> (Arc<ModuleHost>, Arc<SimStream>, Arc<Mutex<Vec<&'static str>>>) {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(LoggerPlugin::build).unwrap();
        host.add_module(UtilitiesPlugin::build).unwrap();

        let stream = Arc::new(SimStream::new());
        let s = Arc::clone(&stream) as Arc<dyn MarketStream>;
        host.add_module(move |h| ConnectionPlugin::build(h, s)).unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        for hook in [hooks::WS_OPENED, hooks::WS_AUTHENTICATED] {
            let sink = Arc::clone(&events);
            host.add_module(move |h| {
                Ok(Arc::new(Probe {
                    core: ModuleBuilder::new(format!("widget:probe-{hook}"))
                        .on(hook, move |_| {
                            let sink = Arc::clone(&sink);
                            Box::pin(async move {
                                lock(&sink).push(hook);
                                Ok(())
                            })
                        })
                        .attach(h)?,
                }))
            })
            .unwrap();
        }

        (host, stream, events)
    }

    #[tokio::test]
    async fn test_boot_opens_and_authenticates_stream() {
        let (host, stream, events) = connection_host().await;

        host.boot().await.unwrap();

        assert!(stream.is_open());
        assert_eq!(
            *lock(&events),
            vec![hooks::WS_OPENED, hooks::WS_AUTHENTICATED]
        );
    }

    #[tokio::test]
    async fn test_double_boot_hook_reports_error() {
        let (host, _stream, _events) = connection_host().await;

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        host.add_module(|h| {
            Ok(Arc::new(Probe {
                core: ModuleBuilder::new("widget:error-probe")
                    .on(hooks::HOST_ERROR, move |data| {
                        let sink = Arc::clone(&sink);
                        Box::pin(async move {
                            if let HookData::Error(event) = data {
                                if !event.is_self_test() {
                                    lock(&sink).push(event.to_string());
                                }
                            }
                            Ok(())
                        })
                    })
                    .attach(h)?,
            }))
        })
        .unwrap();

        host.boot().await.unwrap();
        assert!(lock(&errors).is_empty());

        // a second boot-start emit fails inside the handler and is isolated:
        // it surfaces only on the fallback error hook
        host.emit(hooks::HOST_BOOT_STARTED, HookData::None).await;

        let seen = lock(&errors).clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("prior to host boot"), "got: {seen:?}");
    }

    #[tokio::test]
    async fn test_stream_capability_exposed() {
        let (host, stream, _events) = connection_host().await;

        let api = host.capability::<dyn ConnectionApi>().unwrap();
        assert!(Arc::ptr_eq(
            &(Arc::clone(&stream) as Arc<dyn MarketStream>),
            &api.stream()
        ));
    }
}
