//! Public and account trade feed plugin
//!
//! Subscribes the public trade channel for the host symbol once the stream
//! opens and forwards every trade onto the bus; account trade events are
//! forwarded after authentication.

use std::sync::Arc;

use anyhow::Context;

use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::spawn_emit;
use crate::plugins::ws::connection::ConnectionApi;

pub struct TradesPlugin {
    core: ModuleCore,
}

impl TradesPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let weak_opened = Arc::downgrade(host);
        let weak_authed = Arc::downgrade(host);

        let core = Plugin::builder("data:trades")
            .requires_module("plugin:ws:connection")
            .provides_hook(hooks::DATA_TRADE)
            .provides_hook(hooks::DATA_ACCOUNT_TRADE)
            .provides_hook(hooks::DATA_ACCOUNT_TRADE_UPDATE)
            .on(hooks::WS_OPENED, move |_| {
                let weak = weak_opened.clone();
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();
                    let symbol = host.symbol().to_string();

                    {
                        let weak = weak.clone();
                        let symbol = symbol.clone();
                        stream.on_public_trade(
                            &symbol.clone(),
                            Box::new(move |trade| {
                                spawn_emit(
                                    &weak,
                                    hooks::DATA_TRADE,
                                    HookData::Trade {
                                        symbol: symbol.clone(),
                                        trade,
                                    },
                                );
                            }),
                        );
                    }

                    stream.subscribe_trades(&symbol).await?;
                    Ok(())
                })
            })
            .on(hooks::WS_AUTHENTICATED, move |_| {
                let weak = weak_authed.clone();
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();

                    {
                        let weak = weak.clone();
                        stream.on_account_trade_entry(Box::new(move |trade| {
                            spawn_emit(
                                &weak,
                                hooks::DATA_ACCOUNT_TRADE,
                                HookData::AccountTrade(trade),
                            );
                        }));
                    }

                    {
                        let weak = weak.clone();
                        stream.on_account_trade_update(Box::new(move |trade| {
                            spawn_emit(
                                &weak,
                                hooks::DATA_ACCOUNT_TRADE_UPDATE,
                                HookData::AccountTrade(trade),
                            );
                        }));
                    }

                    Ok(())
                })
            })
            .attach(host)?;

        Ok(Arc::new(Self { core }))
    }
}

impl Module for TradesPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::sim::SimStream;
    use crate::exchange::stream::MarketStream;
    use crate::exchange::types::PublicTrade;
    use crate::host::module::ModuleBuilder;
    use crate::plugins::core::logger::LoggerPlugin;
    use crate::plugins::core::utilities::UtilitiesPlugin;
    use crate::plugins::ws::connection::ConnectionPlugin;
    use crate::util::lock;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Probe {
        core: ModuleCore,
    }

    impl Module for Probe {
        fn core(&self) -> &ModuleCore {
            &self.core
        }
    }

    #[tokio::test]
    async fn test_trades_subscribed_and_forwarded() {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(LoggerPlugin::build).unwrap();
        host.add_module(UtilitiesPlugin::build).unwrap();

        let stream = Arc::new(SimStream::new());
        let s = Arc::clone(&stream) as Arc<dyn MarketStream>;
        host.add_module(move |h| ConnectionPlugin::build(h, s)).unwrap();
        host.add_module(TradesPlugin::build).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        host.add_module(|h| {
            Ok(Arc::new(Probe {
                core: ModuleBuilder::new("widget:trade-log")
                    .on(hooks::DATA_TRADE, move |data| {
                        let sink = Arc::clone(&sink);
                        Box::pin(async move {
                            if let HookData::Trade { trade, .. } = data {
                                lock(&sink).push(trade.amount);
                            }
                            Ok(())
                        })
                    })
                    .attach(h)?,
            }))
        })
        .unwrap();

        host.boot().await.unwrap();
        assert!(stream
            .subscriptions()
            .contains(&"trades:tBTCUSD".to_string()));

        stream.feed_public_trade(
            "tBTCUSD",
            PublicTrade {
                id: 1,
                mts: Utc::now(),
                amount: 0.25,
                price: 40_000.0,
            },
        );

        // the stream callback spawns onto the runtime; yield until delivered
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*lock(&seen), vec![0.25]);
    }
}
