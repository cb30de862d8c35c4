//! Host assembly
//!
//! Builds the full module set in dependency-friendly order (core
//! capabilities first, then the stream connection, data feeds, derived
//! data, alerts and console commands). Order is cosmetic for dependency
//! validation — that happens at boot — but it determines hook listener
//! ordering.

use std::sync::Arc;

use crate::commands::{
    BuyCommand, CancelCommand, ClearCommand, ExitCommand, GetSettingCommand,
    ListExecutableCommand, ListSettingsCommand, PrimeCommand, RmPrimeCommand, SellCommand,
    SetSettingCommand,
};
use crate::config::AppConfig;
use crate::exchange::rest::RestClient;
use crate::exchange::stream::MarketStream;
use crate::host::error::ModuleAddError;
use crate::host::module_host::ModuleHost;
use crate::plugins::alerts::{TradeGroupSizeAlertsPlugin, TradeSizeAlertsPlugin};
use crate::plugins::core::notifications::{NotificationSink, NotificationsPlugin};
use crate::plugins::core::{LoggerPlugin, SettingsPlugin, UtilitiesPlugin};
use crate::plugins::data::{
    CandlesPlugin, MarginInfoPlugin, MarketInfoPlugin, OrderBooksPlugin, OrdersPlugin,
    PositionsPlugin, TradesPlugin,
};
use crate::plugins::meta::{PrimesPlugin, TradeGroupsPlugin};
use crate::plugins::ws::ConnectionPlugin;

/// External collaborators injected into the host.
pub struct HostDeps {
    pub stream: Arc<dyn MarketStream>,
    pub rest: Arc<dyn RestClient>,
    pub sink: Arc<dyn NotificationSink>,
}

/// Assemble a host with the full plugin and command set. The returned host
/// is unbooted; call `boot()` to begin operation.
pub fn build_host(config: &AppConfig, deps: HostDeps) -> Result<Arc<ModuleHost>, ModuleAddError> {
    let host = ModuleHost::new(config.symbol.clone());

    host.add_module(LoggerPlugin::build)?;
    host.add_module(UtilitiesPlugin::build)?;
    host.add_module(SettingsPlugin::build)?;
    {
        let sink = Arc::clone(&deps.sink);
        host.add_module(move |h| NotificationsPlugin::build(h, sink))?;
    }

    {
        let stream = Arc::clone(&deps.stream);
        host.add_module(move |h| ConnectionPlugin::build(h, stream))?;
    }

    {
        let rest = Arc::clone(&deps.rest);
        host.add_module(move |h| MarginInfoPlugin::build(h, rest))?;
    }
    {
        let rest = Arc::clone(&deps.rest);
        host.add_module(move |h| MarketInfoPlugin::build(h, rest))?;
    }

    host.add_module(TradesPlugin::build)?;
    host.add_module(PositionsPlugin::build)?;
    host.add_module(OrderBooksPlugin::build)?;
    host.add_module(OrdersPlugin::build)?;
    host.add_module(CandlesPlugin::build)?;
    host.add_module(TradeGroupsPlugin::build)?;
    host.add_module(TradeSizeAlertsPlugin::build)?;
    host.add_module(TradeGroupSizeAlertsPlugin::build)?;
    host.add_module(PrimesPlugin::build)?;

    host.add_module(BuyCommand::build)?;
    host.add_module(SellCommand::build)?;
    host.add_module(CancelCommand::build)?;
    host.add_module(ExitCommand::build)?;
    host.add_module(SetSettingCommand::build)?;
    host.add_module(GetSettingCommand::build)?;
    host.add_module(ListSettingsCommand::build)?;
    host.add_module(PrimeCommand::build)?;
    host.add_module(RmPrimeCommand::build)?;
    host.add_module(ClearCommand::build)?;
    host.add_module(ListExecutableCommand::build)?;

    Ok(host)
}
