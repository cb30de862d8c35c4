//! Candle feed plugin
//!
//! Subscribes candle channels for every supported timeframe on the host
//! symbol, maintains the per-key candle sets, and keeps the last candle's
//! close in sync with the live trade feed between candle updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::exchange::types::Candle;
use crate::host::error::{ErrorEvent, ModuleAddError};
use crate::host::hooks::{self, HookData};
use crate::host::id::ModuleId;
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::spawn_emit;
use crate::plugins::ws::connection::ConnectionApi;
use crate::util::lock;

/// Timeframes subscribed for the active symbol
pub const TIME_FRAMES: [&str; 9] = ["1m", "5m", "15m", "30m", "1h", "4h", "12h", "1D", "1W"];

/// Channel key for a timeframe/symbol pair
pub fn candle_key(tf: &str, symbol: &str) -> String {
    format!("trade:{tf}:{symbol}")
}

/// Read access to the maintained candle sets.
pub trait CandlesApi: Send + Sync {
    fn candles(&self, key: &str) -> Vec<Candle>;
}

type CandleStore = Arc<Mutex<HashMap<String, Vec<Candle>>>>;

pub struct CandlesPlugin {
    core: ModuleCore,
    store: CandleStore,
}

impl CandlesPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let store: CandleStore = Arc::new(Mutex::new(HashMap::new()));

        let weak_opened = Arc::downgrade(host);
        let weak_trade = Arc::downgrade(host);
        let opened_store = Arc::clone(&store);
        let trade_store = Arc::clone(&store);

        let core = Plugin::builder("data:candles")
            .requires_module("plugin:ws:connection")
            .requires_module("plugin:data:trades")
            .provides_hook(hooks::DATA_CANDLES)
            .host_methods(&["candles"])
            .on(hooks::WS_OPENED, move |_| {
                let weak = weak_opened.clone();
                let store = Arc::clone(&opened_store);
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();
                    let symbol = host.symbol().to_string();

                    for tf in TIME_FRAMES {
                        let key = candle_key(tf, &symbol);

                        {
                            let weak = weak.clone();
                            let store = Arc::clone(&store);
                            let key = key.clone();
                            let symbol = symbol.clone();

                            stream.on_candles(
                                &key.clone(),
                                Box::new(move |candles| {
                                    match merge_candles(&store, &key, candles) {
                                        Ok(merged) => spawn_emit(
                                            &weak,
                                            hooks::DATA_CANDLES,
                                            HookData::Candles {
                                                key: key.clone(),
                                                symbol: symbol.clone(),
                                                tf: tf.to_string(),
                                                candles: merged,
                                            },
                                        ),
                                        Err(message) => {
                                            if let Ok(module) =
                                                ModuleId::parse("plugin:data:candles")
                                            {
                                                spawn_emit(
                                                    &weak,
                                                    hooks::HOST_ERROR,
                                                    HookData::Error(ErrorEvent::Module {
                                                        module,
                                                        message,
                                                    }),
                                                );
                                            }
                                        }
                                    }
                                }),
                            );
                        }

                        stream.subscribe_candles(&key).await?;
                    }

                    Ok(())
                })
            })
            .on(hooks::DATA_TRADE, move |data| {
                let store = Arc::clone(&trade_store);
                let weak = weak_trade.clone();
                Box::pin(async move {
                    let HookData::Trade { symbol, trade } = data else {
                        return Ok(());
                    };

                    // refresh the in-progress candle close for matching keys
                    let mut updated = Vec::new();
                    {
                        let mut store = lock(&store);
                        for (key, candles) in store.iter_mut() {
                            if key.rsplit(':').next() != Some(symbol.as_str()) {
                                continue;
                            }

                            if let Some(last) = candles.last_mut() {
                                last.close = trade.price;
                                updated.push((key.clone(), candles.clone()));
                            }
                        }
                    }

                    let Some(host) = weak.upgrade() else {
                        return Ok(());
                    };

                    // emit refreshed sets outside the store lock
                    for (key, candles) in updated {
                        let tf = key.split(':').nth(1).unwrap_or_default().to_string();

                        host.emit(
                            hooks::DATA_CANDLES,
                            HookData::Candles {
                                key,
                                symbol: symbol.clone(),
                                tf,
                                candles,
                            },
                        )
                        .await;
                    }

                    Ok(())
                })
            })
            .attach(host)?;

        let plugin = Arc::new(Self { core, store });
        host.provide::<dyn CandlesApi>(plugin.id(), Arc::clone(&plugin) as Arc<dyn CandlesApi>)?;
        Ok(plugin)
    }
}

/// Apply a snapshot or two-candle update to the store, returning the new
/// set for the key. Updates before any snapshot are an error.
fn merge_candles(
    store: &CandleStore,
    key: &str,
    incoming: Vec<Candle>,
) -> Result<Vec<Candle>, String> {
    let mut store = lock(store);

    if incoming.len() > 2 {
        store.insert(key.to_string(), incoming.clone());
        return Ok(incoming);
    }

    let Some(existing) = store.get_mut(key) else {
        return Err(format!("received candle update prior to snapshot [{key}]"));
    };

    // an update carries the current and previous candle together
    let len = existing.len();
    for (offset, candle) in incoming.into_iter().enumerate() {
        if let Some(slot) = len.checked_sub(offset + 1).and_then(|i| existing.get_mut(i)) {
            *slot = candle;
        }
    }

    Ok(existing.clone())
}

impl Module for CandlesPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

impl CandlesApi for CandlesPlugin {
    fn candles(&self, key: &str) -> Vec<Candle> {
        lock(&self.store).get(key).cloned().unwrap_or_default()
    }
}
