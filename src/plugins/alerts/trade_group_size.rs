//! Trade group size alert plugin
//!
//! Raises an important notification when an accumulated trade group exceeds
//! the configured threshold, at most once per run. The threshold lives in
//! the `alerts.group-trade-size` setting and is seeded from the market's
//! minimum trade size when unset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::format::format_amount;
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData, Notification, NotificationLevel, TradeGroup};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::settings::SettingsApi;
use crate::settings::{SettingDefinition, SettingUpdate, SettingValue, SettingsError};

pub const GROUP_SIZE_SETTING: &str = "alerts.group-trade-size";

/// Seed multiplier applied to the market minimum trade size.
const DEFAULT_MIN_SIZE_MUL: f64 = 30_000.0;

#[async_trait]
pub trait GroupSizeAlertsApi: Send + Sync {
    fn group_size_threshold(&self) -> f64;

    async fn set_group_size_threshold(&self, value: f64) -> Result<(), SettingsError>;
}

struct AlertFlags {
    buy_alerted: AtomicBool,
    sell_alerted: AtomicBool,
}

pub struct TradeGroupSizeAlertsPlugin {
    core: ModuleCore,
    settings: Arc<dyn SettingsApi>,
}

fn threshold(settings: &dyn SettingsApi) -> f64 {
    settings
        .get_setting(GROUP_SIZE_SETTING)
        .and_then(|v| v.as_number())
        .unwrap_or(0.0)
}

fn group_notification(group: &TradeGroup, threshold: f64) -> Notification {
    Notification::new(
        NotificationLevel::Important,
        "Group Size Alert",
        format!(
            "{} group over threshold {}: {} for {} trades",
            if group.amount < 0.0 { "sell" } else { "buy" },
            format_amount(threshold),
            format_amount(group.amount),
            group.count,
        ),
    )
}

impl TradeGroupSizeAlertsPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let settings = host.capability::<dyn SettingsApi>()?;

        let flags = Arc::new(AlertFlags {
            buy_alerted: AtomicBool::new(false),
            sell_alerted: AtomicBool::new(false),
        });

        let market_settings = Arc::clone(&settings);
        let sell_settings = Arc::clone(&settings);
        let buy_settings = Arc::clone(&settings);
        let sell_flags = Arc::clone(&flags);
        let buy_flags = Arc::clone(&flags);
        let weak_sell = Arc::downgrade(host);
        let weak_buy = Arc::downgrade(host);

        let core = Plugin::builder("alerts:trade-group-size")
            .requires_module("plugin:core:settings")
            .requires_module("plugin:data:market-info")
            .requires_hook(hooks::NOTIFY_IMPORTANT)
            .provides_hook(hooks::ALERT_GROUP_SIZE_THRESHOLD)
            .host_methods(&["group_size_threshold"])
            .async_host_methods(&["set_group_size_threshold"])
            .on(hooks::DATA_MARKET_INFO, move |data| {
                let settings = Arc::clone(&market_settings);
                Box::pin(async move {
                    let HookData::MarketInfo(info) = data else {
                        return Ok(());
                    };

                    if threshold(settings.as_ref()) == 0.0 {
                        settings
                            .set_setting(
                                GROUP_SIZE_SETTING,
                                SettingValue::Number(info.min_trade_size * DEFAULT_MIN_SIZE_MUL),
                            )
                            .await?;
                    }

                    Ok(())
                })
            })
            .on(hooks::DATA_SELL_TRADE_GROUP, move |data| {
                let settings = Arc::clone(&sell_settings);
                let flags = Arc::clone(&sell_flags);
                let weak = weak_sell.clone();
                Box::pin(async move {
                    let HookData::TradeGroup(group) = data else {
                        return Ok(());
                    };

                    flags.buy_alerted.store(false, Ordering::SeqCst);

                    let threshold = threshold(settings.as_ref());
                    if threshold == 0.0 {
                        return Ok(());
                    }

                    if !flags.sell_alerted.load(Ordering::SeqCst)
                        && group.amount < 0.0
                        && group.amount < -threshold
                    {
                        flags.sell_alerted.store(true, Ordering::SeqCst);

                        let host = weak.upgrade().context("module host dropped")?;
                        host.emit(
                            hooks::NOTIFY_IMPORTANT,
                            HookData::Notification(group_notification(&group, threshold)),
                        )
                        .await;
                    }

                    Ok(())
                })
            })
            .on(hooks::DATA_BUY_TRADE_GROUP, move |data| {
                let settings = Arc::clone(&buy_settings);
                let flags = Arc::clone(&buy_flags);
                let weak = weak_buy.clone();
                Box::pin(async move {
                    let HookData::TradeGroup(group) = data else {
                        return Ok(());
                    };

                    flags.sell_alerted.store(false, Ordering::SeqCst);

                    let threshold = threshold(settings.as_ref());
                    if threshold == 0.0 {
                        return Ok(());
                    }

                    if !flags.buy_alerted.load(Ordering::SeqCst)
                        && group.amount > 0.0
                        && group.amount > threshold
                    {
                        flags.buy_alerted.store(true, Ordering::SeqCst);

                        let host = weak.upgrade().context("module host dropped")?;
                        host.emit(
                            hooks::NOTIFY_IMPORTANT,
                            HookData::Notification(group_notification(&group, threshold)),
                        )
                        .await;
                    }

                    Ok(())
                })
            })
            .attach(host)?;

        settings
            .define_setting(
                SettingDefinition::number(
                    GROUP_SIZE_SETTING,
                    "Minimum trade group size to alert for",
                )
                .with_validate(|v| matches!(v, SettingValue::Number(n) if n.is_finite()))
                .with_value(0.0),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let weak = core.host_weak();
        settings
            .subscribe_setting(
                GROUP_SIZE_SETTING,
                Box::new(move |update| {
                    let weak = weak.clone();
                    Box::pin(async move {
                        let Some(host) = weak.upgrade() else {
                            return;
                        };
                        let value = match update {
                            SettingUpdate::Value(v) => Some(v),
                            SettingUpdate::Removed => None,
                        };
                        host.emit(
                            hooks::ALERT_GROUP_SIZE_THRESHOLD,
                            HookData::Setting {
                                key: GROUP_SIZE_SETTING.to_string(),
                                value,
                            },
                        )
                        .await;
                    })
                }),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let plugin = Arc::new(Self { core, settings });
        host.provide::<dyn GroupSizeAlertsApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn GroupSizeAlertsApi>,
        )?;
        Ok(plugin)
    }
}

impl Module for TradeGroupSizeAlertsPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl GroupSizeAlertsApi for TradeGroupSizeAlertsPlugin {
    fn group_size_threshold(&self) -> f64 {
        threshold(self.settings.as_ref())
    }

    async fn set_group_size_threshold(&self, value: f64) -> Result<(), SettingsError> {
        self.settings
            .set_setting(GROUP_SIZE_SETTING, SettingValue::Number(value))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::module::ModuleBuilder;
    use crate::plugins::core::settings::SettingsPlugin;
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

    async fn group_alerts_host() -> (
        Arc<ModuleHost>,
        Arc<TradeGroupSizeAlertsPlugin>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(SettingsPlugin::build).unwrap();
        let plugin = host.add_module(TradeGroupSizeAlertsPlugin::build).unwrap();

        let alerts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&alerts);
        host.add_module(|h| {
            Ok(Arc::new(Probe {
                core: ModuleBuilder::new("plugin:test:notify-sink")
                    .on(hooks::NOTIFY_IMPORTANT, move |data| {
                        let sink = Arc::clone(&sink);
                        Box::pin(async move {
                            if let HookData::Notification(n) = data {
                                lock(&sink).push(n.message);
                            }
                            Ok(())
                        })
                    })
                    .attach(h)?,
            }))
        })
        .unwrap();

        (host, plugin, alerts)
    }

    fn group(amount: f64, count: u32) -> HookData {
        HookData::TradeGroup(TradeGroup { amount, count })
    }

    #[tokio::test]
    async fn test_one_alert_per_group_run() {
        let (host, plugin, alerts) = group_alerts_host().await;
        plugin.set_group_size_threshold(1.0).await.unwrap();

        host.emit(hooks::DATA_BUY_TRADE_GROUP, group(1.5, 2)).await;
        host.emit(hooks::DATA_BUY_TRADE_GROUP, group(2.5, 3)).await;
        assert_eq!(lock(&alerts).len(), 1, "one alert per run");

        // direction flip resets the buy flag; a new buy run alerts again
        host.emit(hooks::DATA_SELL_TRADE_GROUP, group(-0.2, 1)).await;
        host.emit(hooks::DATA_BUY_TRADE_GROUP, group(1.2, 1)).await;
        assert_eq!(lock(&alerts).len(), 2);
    }

    #[tokio::test]
    async fn test_sell_groups_alert_on_negative_threshold_crossing() {
        let (host, plugin, alerts) = group_alerts_host().await;
        plugin.set_group_size_threshold(2.0).await.unwrap();

        host.emit(hooks::DATA_SELL_TRADE_GROUP, group(-1.0, 1)).await;
        assert!(lock(&alerts).is_empty());

        host.emit(hooks::DATA_SELL_TRADE_GROUP, group(-2.5, 2)).await;
        let seen = lock(&alerts).clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("sell group"), "got: {seen:?}");
    }
}
