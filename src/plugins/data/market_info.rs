//! Market info plugin
//!
//! Derives the static market configuration (max leverage, minimum trade
//! size, price precision) for the host symbol from the REST client on boot.

use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::exchange::rest::RestClient;
use crate::exchange::types::MarketInfo;
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::utilities::UtilitiesApi;
use crate::util::lock;

/// Last-known market configuration for the host symbol.
pub trait MarketInfoApi: Send + Sync {
    /// `None` until the boot-time fetch resolves.
    fn market_info(&self) -> Option<MarketInfo>;
}

type MarketStore = Arc<Mutex<Option<MarketInfo>>>;

pub struct MarketInfoPlugin {
    core: ModuleCore,
    store: MarketStore,
}

impl MarketInfoPlugin {
    pub fn build(
        host: &Arc<ModuleHost>,
        rest: Arc<dyn RestClient>,
    ) -> Result<Arc<Self>, ModuleAddError> {
        let store: MarketStore = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(host);
        let boot_store = Arc::clone(&store);

        let core = Plugin::builder("data:market-info")
            .requires_module("plugin:core:logger")
            .provides_hook(hooks::DATA_MARKET_INFO)
            .host_methods(&["market_info"])
            .on(hooks::HOST_BOOT_STARTED, move |_| {
                let weak = weak.clone();
                let rest = Arc::clone(&rest);
                let store = Arc::clone(&boot_store);
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let utilities = host.capability::<dyn UtilitiesApi>()?;
                    let symbol = host.symbol().to_string();

                    let timer = utilities.log_duration("pair config fetch").await;
                    let pair = rest.pair_config(&symbol).await?;
                    timer.finish().await;

                    let timer = utilities.log_duration("symbol details fetch").await;
                    let details = rest.symbol_details(&symbol).await?;
                    timer.finish().await;

                    let info = MarketInfo {
                        symbol: symbol.clone(),
                        max_leverage: pair.max_leverage,
                        min_trade_size: pair.min_trade_size,
                        price_precision: details.price_precision,
                    };

                    *lock(&store) = Some(info.clone());
                    host.emit(hooks::DATA_MARKET_INFO, HookData::MarketInfo(info))
                        .await;
                    Ok(())
                })
            })
            .attach(host)?;

        let plugin = Arc::new(Self { core, store });
        host.provide::<dyn MarketInfoApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn MarketInfoApi>,
        )?;
        Ok(plugin)
    }
}

impl Module for MarketInfoPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

impl MarketInfoApi for MarketInfoPlugin {
    fn market_info(&self) -> Option<MarketInfo> {
        lock(&self.store).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::sim::SimRest;
    use crate::plugins::core::logger::LoggerPlugin;
    use crate::plugins::core::utilities::UtilitiesPlugin;

    #[tokio::test]
    async fn test_market_info_derived_on_boot() {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(LoggerPlugin::build).unwrap();
        host.add_module(UtilitiesPlugin::build).unwrap();

        let rest = Arc::new(SimRest::new("tBTCUSD")) as Arc<dyn RestClient>;
        host.add_module(move |h| MarketInfoPlugin::build(h, rest)).unwrap();

        host.boot().await.unwrap();

        let api = host.capability::<dyn MarketInfoApi>().unwrap();
        let info = api.market_info().unwrap();
        assert_eq!(info.symbol, "tBTCUSD");
        assert_eq!(info.min_trade_size, 0.002);
        assert_eq!(info.price_precision, 5);
    }
}
