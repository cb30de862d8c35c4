//! Alerting plugins backed by runtime settings

pub mod trade_group_size;
pub mod trade_size;

pub use trade_group_size::{GroupSizeAlertsApi, TradeGroupSizeAlertsPlugin, GROUP_SIZE_SETTING};
pub use trade_size::{TradeSizeAlertsApi, TradeSizeAlertsPlugin, TRADE_SIZE_SETTING};
