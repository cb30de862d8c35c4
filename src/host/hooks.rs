//! Hook names and payloads
//!
//! Hooks are the bus's unit of loose coupling: modules declare which names
//! they provide and require, and the host validates the aggregate graph at
//! boot. Payloads are typed; `Json` exists as an escape hatch for hooks
//! without a dedicated variant (payload must be a JSON object).

use serde::{Deserialize, Serialize};

use crate::exchange::types::{
    AccountTrade, Candle, MarginInfo, MarketInfo, Order, OrderBook, Position, PublicTrade,
};
use crate::host::error::ErrorEvent;
use crate::settings::SettingValue;

// Host-provided hooks
pub const HOST_BOOT_STARTED: &str = "host:boot-started";
pub const HOST_ERROR: &str = "host:error";

// Logger plugin
pub const LOG_OUTPUT: &str = "log:output";
pub const LOG_OUTPUT_CLEAR: &str = "log:output-clear";
pub const LOG_DEBUG: &str = "log:debug";
pub const LOG_DEBUG_CLEAR_LAST: &str = "log:debug-clear-last";

// Notifications plugin
pub const NOTIFY_GENERIC: &str = "notify:generic";
pub const NOTIFY_SUCCESS: &str = "notify:success";
pub const NOTIFY_ERROR: &str = "notify:error";
pub const NOTIFY_IMPORTANT: &str = "notify:important";
pub const NOTIFY_ENABLED_CHANGED: &str = "notify:enabled-changed";

// Stream connection plugin
pub const WS_OPENED: &str = "ws:opened";
pub const WS_AUTHENTICATED: &str = "ws:authenticated";
pub const WS_CLOSED: &str = "ws:closed";
pub const WS_ERROR: &str = "ws:error";

// Data plugins
pub const DATA_TRADE: &str = "data:trade";
pub const DATA_ACCOUNT_TRADE: &str = "data:account-trade";
pub const DATA_ACCOUNT_TRADE_UPDATE: &str = "data:account-trade-update";
pub const DATA_CANDLES: &str = "data:candles";
pub const DATA_ORDER_BOOK: &str = "data:order-book";
pub const DATA_ORDER_SNAPSHOT: &str = "data:order-snapshot";
pub const DATA_ORDER_CREATED: &str = "data:order-created";
pub const DATA_ORDER_UPDATED: &str = "data:order-updated";
pub const DATA_ORDER_CLOSED: &str = "data:order-closed";
pub const DATA_POSITION_SNAPSHOT: &str = "data:position-snapshot";
pub const DATA_POSITION_CREATED: &str = "data:position-created";
pub const DATA_POSITION_UPDATED: &str = "data:position-updated";
pub const DATA_POSITION_CLOSED: &str = "data:position-closed";
pub const DATA_MARGIN_INFO: &str = "data:margin-info";
pub const DATA_MARKET_INFO: &str = "data:market-info";

// Meta / alert plugins
pub const DATA_BUY_TRADE_GROUP: &str = "data:buy-trade-group";
pub const DATA_SELL_TRADE_GROUP: &str = "data:sell-trade-group";
pub const ALERT_TRADE_SIZE_THRESHOLD: &str = "alert:trade-size-threshold";
pub const ALERT_GROUP_SIZE_THRESHOLD: &str = "alert:group-size-threshold";
pub const PRIME_TRIGGERED: &str = "prime:triggered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Generic,
    Success,
    Error,
    Important,
}

impl NotificationLevel {
    /// Title prefix used when the notification is delivered.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Generic => "",
            Self::Success => "Success: ",
            Self::Error => "Error: ",
            Self::Important => "Important: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Accumulated run of consecutive same-direction trades
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeGroup {
    /// Total signed size of the run
    pub amount: f64,
    /// Number of trades in the run
    pub count: u32,
}

/// Typed hook payload.
#[derive(Debug, Clone)]
pub enum HookData {
    None,
    Error(ErrorEvent),
    Line(String),
    Notification(Notification),
    Trade {
        symbol: String,
        trade: PublicTrade,
    },
    AccountTrade(AccountTrade),
    Candles {
        key: String,
        symbol: String,
        tf: String,
        candles: Vec<Candle>,
    },
    OrderBook {
        symbol: String,
        book: OrderBook,
    },
    Orders(Vec<Order>),
    Order(Order),
    Positions(Vec<Position>),
    Position(Position),
    MarginInfo(MarginInfo),
    MarketInfo(MarketInfo),
    TradeGroup(TradeGroup),
    Setting {
        key: String,
        value: Option<SettingValue>,
    },
    /// Escape hatch for hooks without a dedicated variant; must hold a JSON
    /// object when emitted through a module.
    Json(serde_json::Value),
}
