//! Trade size alert plugin
//!
//! Watches the public trade feed and raises an important notification when
//! a single trade exceeds the configured threshold. The threshold lives in
//! the `alerts.trade-size` setting and is seeded from the market's minimum
//! trade size when unset.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::format::format_amount;
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData, Notification, NotificationLevel};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::settings::SettingsApi;
use crate::settings::{SettingDefinition, SettingUpdate, SettingValue, SettingsError};

pub const TRADE_SIZE_SETTING: &str = "alerts.trade-size";

/// Seed multiplier applied to the market minimum trade size.
const DEFAULT_MIN_SIZE_MUL: f64 = 1000.0;

#[async_trait]
pub trait TradeSizeAlertsApi: Send + Sync {
    fn trade_size_threshold(&self) -> f64;

    async fn set_trade_size_threshold(&self, value: f64) -> Result<(), SettingsError>;
}

pub struct TradeSizeAlertsPlugin {
    core: ModuleCore,
    settings: Arc<dyn SettingsApi>,
}

fn threshold(settings: &dyn SettingsApi) -> f64 {
    settings
        .get_setting(TRADE_SIZE_SETTING)
        .and_then(|v| v.as_number())
        .unwrap_or(0.0)
}

impl TradeSizeAlertsPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let settings = host.capability::<dyn SettingsApi>()?;

        let market_settings = Arc::clone(&settings);
        let trade_settings = Arc::clone(&settings);
        let weak_trade = Arc::downgrade(host);

        let core = Plugin::builder("alerts:trade-size")
            .requires_module("plugin:core:settings")
            .requires_module("plugin:data:market-info")
            .requires_module("plugin:data:trades")
            .requires_hook(hooks::NOTIFY_IMPORTANT)
            .provides_hook(hooks::ALERT_TRADE_SIZE_THRESHOLD)
            .host_methods(&["trade_size_threshold"])
            .async_host_methods(&["set_trade_size_threshold"])
            .on(hooks::DATA_MARKET_INFO, move |data| {
                let settings = Arc::clone(&market_settings);
                Box::pin(async move {
                    let HookData::MarketInfo(info) = data else {
                        return Ok(());
                    };

                    if threshold(settings.as_ref()) == 0.0 {
                        settings
                            .set_setting(
                                TRADE_SIZE_SETTING,
                                SettingValue::Number(info.min_trade_size * DEFAULT_MIN_SIZE_MUL),
                            )
                            .await?;
                    }

                    Ok(())
                })
            })
            .on(hooks::DATA_TRADE, move |data| {
                let settings = Arc::clone(&trade_settings);
                let weak = weak_trade.clone();
                Box::pin(async move {
                    let HookData::Trade { trade, .. } = data else {
                        return Ok(());
                    };

                    let threshold = threshold(settings.as_ref());
                    if threshold == 0.0 {
                        return Ok(());
                    }

                    let amount = trade.amount;
                    if (amount < 0.0 && amount < -threshold)
                        || (amount > 0.0 && amount > threshold)
                    {
                        let host = weak.upgrade().context("module host dropped")?;
                        host.emit(
                            hooks::NOTIFY_IMPORTANT,
                            HookData::Notification(Notification::new(
                                NotificationLevel::Important,
                                "Trade Size Alert",
                                format!(
                                    "saw {} over threshold {}: {} @ {}",
                                    if amount < 0.0 { "sell" } else { "buy" },
                                    format_amount(threshold),
                                    format_amount(amount),
                                    trade.price,
                                ),
                            )),
                        )
                        .await;
                    }

                    Ok(())
                })
            })
            .attach(host)?;

        settings
            .define_setting(
                SettingDefinition::number(TRADE_SIZE_SETTING, "Minimum trade size to alert for")
                    .with_validate(|v| matches!(v, SettingValue::Number(n) if n.is_finite()))
                    .with_value(0.0),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let weak = core.host_weak();
        settings
            .subscribe_setting(
                TRADE_SIZE_SETTING,
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
                            hooks::ALERT_TRADE_SIZE_THRESHOLD,
                            HookData::Setting {
                                key: TRADE_SIZE_SETTING.to_string(),
                                value,
                            },
                        )
                        .await;
                    })
                }),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let plugin = Arc::new(Self { core, settings });
        host.provide::<dyn TradeSizeAlertsApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn TradeSizeAlertsApi>,
        )?;
        Ok(plugin)
    }
}

impl Module for TradeSizeAlertsPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl TradeSizeAlertsApi for TradeSizeAlertsPlugin {
    fn trade_size_threshold(&self) -> f64 {
        threshold(self.settings.as_ref())
    }

    async fn set_trade_size_threshold(&self, value: f64) -> Result<(), SettingsError> {
        self.settings
            .set_setting(TRADE_SIZE_SETTING, SettingValue::Number(value))
            .await
            .map(|_| ())
    }
}
