//! Margin info plugin
//!
//! Fetches the initial base margin snapshot over REST on boot and follows
//! live updates from the stream after authentication.

use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::exchange::rest::RestClient;
use crate::exchange::types::MarginInfo;
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::utilities::UtilitiesApi;
use crate::plugins::spawn_emit;
use crate::plugins::ws::connection::ConnectionApi;
use crate::util::lock;

/// Last-known base margin information.
pub trait MarginInfoApi: Send + Sync {
    /// `None` until the boot-time fetch resolves.
    fn margin_info(&self) -> Option<MarginInfo>;
}

type MarginStore = Arc<Mutex<Option<MarginInfo>>>;

pub struct MarginInfoPlugin {
    core: ModuleCore,
    store: MarginStore,
}

impl MarginInfoPlugin {
    pub fn build(
        host: &Arc<ModuleHost>,
        rest: Arc<dyn RestClient>,
    ) -> Result<Arc<Self>, ModuleAddError> {
        let store: MarginStore = Arc::new(Mutex::new(None));

        let weak_boot = Arc::downgrade(host);
        let weak_authed = Arc::downgrade(host);
        let boot_store = Arc::clone(&store);
        let authed_store = Arc::clone(&store);

        let core = Plugin::builder("data:margin-info")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:ws:connection")
            .provides_hook(hooks::DATA_MARGIN_INFO)
            .host_methods(&["margin_info"])
            .on(hooks::HOST_BOOT_STARTED, move |_| {
                let weak = weak_boot.clone();
                let rest = Arc::clone(&rest);
                let store = Arc::clone(&boot_store);
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let utilities = host.capability::<dyn UtilitiesApi>()?;

                    let timer = utilities.log_duration("margin info fetch").await;
                    let info = rest.margin_info().await?;
                    timer.finish().await;

                    *lock(&store) = Some(info.clone());
                    host.emit(hooks::DATA_MARGIN_INFO, HookData::MarginInfo(info))
                        .await;
                    Ok(())
                })
            })
            .on(hooks::WS_AUTHENTICATED, move |_| {
                let weak = weak_authed.clone();
                let store = Arc::clone(&authed_store);
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();

                    let weak = weak.clone();
                    stream.on_margin_info(Box::new(move |info| {
                        *lock(&store) = Some(info.clone());
                        spawn_emit(&weak, hooks::DATA_MARGIN_INFO, HookData::MarginInfo(info));
                    }));

                    Ok(())
                })
            })
            .attach(host)?;

        let plugin = Arc::new(Self { core, store });
        host.provide::<dyn MarginInfoApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn MarginInfoApi>,
        )?;
        Ok(plugin)
    }
}

impl Module for MarginInfoPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

impl MarginInfoApi for MarginInfoPlugin {
    fn margin_info(&self) -> Option<MarginInfo> {
        lock(&self.store).clone()
    }
}
