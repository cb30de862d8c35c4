//! Trade group tracking plugin
//!
//! A trade group is a run of consecutive trades in the same direction; the
//! opposite side's run resets whenever direction flips. Group updates feed
//! the group-size alerting plugin.

use std::sync::{Arc, Mutex};

use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData, TradeGroup};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::util::lock;

#[derive(Default)]
struct Groups {
    buy_size: f64,
    buy_count: u32,
    sell_size: f64,
    sell_count: u32,
}

pub struct TradeGroupsPlugin {
    core: ModuleCore,
}

impl TradeGroupsPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let groups = Arc::new(Mutex::new(Groups::default()));
        let weak = Arc::downgrade(host);

        let core = Plugin::builder("meta:trade-groups")
            .requires_module("plugin:data:trades")
            .provides_hook(hooks::DATA_BUY_TRADE_GROUP)
            .provides_hook(hooks::DATA_SELL_TRADE_GROUP)
            .on(hooks::DATA_TRADE, move |data| {
                let weak = weak.clone();
                let groups = Arc::clone(&groups);
                Box::pin(async move {
                    let HookData::Trade { trade, .. } = data else {
                        return Ok(());
                    };

                    let (hook, group) = {
                        let mut groups = lock(&groups);

                        if trade.amount < 0.0 {
                            groups.buy_size = 0.0;
                            groups.buy_count = 0;
                            groups.sell_size += trade.amount;
                            groups.sell_count += 1;

                            (
                                hooks::DATA_SELL_TRADE_GROUP,
                                TradeGroup {
                                    amount: groups.sell_size,
                                    count: groups.sell_count,
                                },
                            )
                        } else {
                            groups.sell_size = 0.0;
                            groups.sell_count = 0;
                            groups.buy_size += trade.amount;
                            groups.buy_count += 1;

                            (
                                hooks::DATA_BUY_TRADE_GROUP,
                                TradeGroup {
                                    amount: groups.buy_size,
                                    count: groups.buy_count,
                                },
                            )
                        }
                    };

                    if let Some(host) = weak.upgrade() {
                        host.emit(hook, HookData::TradeGroup(group)).await;
                    }

                    Ok(())
                })
            })
            .attach(host)?;

        Ok(Arc::new(Self { core }))
    }
}

impl Module for TradeGroupsPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::types::PublicTrade;
    use crate::host::module::ModuleBuilder;
    use chrono::Utc;

    struct Probe {
        core: ModuleCore,
    }

    impl Module for Probe {
        fn core(&self) -> &ModuleCore {
            &self.core
        }
    }

    fn trade(amount: f64) -> HookData {
        HookData::Trade {
            symbol: "tBTCUSD".to_string(),
            trade: PublicTrade {
                id: 1,
                mts: Utc::now(),
                amount,
                price: 40_000.0,
            },
        }
    }

    #[tokio::test]
    async fn test_groups_accumulate_and_reset_on_direction_flip() {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(TradeGroupsPlugin::build).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for hook in [hooks::DATA_BUY_TRADE_GROUP, hooks::DATA_SELL_TRADE_GROUP] {
            let sink = Arc::clone(&seen);
            host.add_module(move |h| {
                Ok(Arc::new(Probe {
                    core: ModuleBuilder::new(format!("widget:probe-{hook}"))
                        .on(hook, move |data| {
                            let sink = Arc::clone(&sink);
                            Box::pin(async move {
                                if let HookData::TradeGroup(group) = data {
                                    lock(&sink).push((hook, group.amount, group.count));
                                }
                                Ok(())
                            })
                        })
                        .attach(h)?,
                }))
            })
            .unwrap();
        }

        for amount in [0.5, 0.25, -1.0, -0.5, 2.0] {
            host.emit(hooks::DATA_TRADE, trade(amount)).await;
        }

        assert_eq!(
            *lock(&seen),
            vec![
                (hooks::DATA_BUY_TRADE_GROUP, 0.5, 1),
                (hooks::DATA_BUY_TRADE_GROUP, 0.75, 2),
                (hooks::DATA_SELL_TRADE_GROUP, -1.0, 1),
                (hooks::DATA_SELL_TRADE_GROUP, -1.5, 2),
                // a buy after sells restarts the buy run from scratch
                (hooks::DATA_BUY_TRADE_GROUP, 2.0, 1),
            ]
        );
    }
}
