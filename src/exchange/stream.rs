//! Streaming client interface consumed by the data plugins
//!
//! The concrete implementation (WebSocket transport, wire parsing, order
//! lifecycle state machine) lives in the vendor SDK; this trait captures the
//! surface the terminal actually uses: lifecycle, channel subscriptions,
//! per-channel callback registration and a raw send primitive for batch
//! cancels.

use async_trait::async_trait;

use crate::exchange::errors::ExchangeResult;
use crate::exchange::types::{
    AccountTrade, Candle, MarginInfo, Order, OrderBook, Position, PublicTrade,
};

pub type TradeCallback = Box<dyn Fn(PublicTrade) + Send + Sync>;
pub type AccountTradeCallback = Box<dyn Fn(AccountTrade) + Send + Sync>;
pub type CandlesCallback = Box<dyn Fn(Vec<Candle>) + Send + Sync>;
pub type OrderBookCallback = Box<dyn Fn(OrderBook) + Send + Sync>;
pub type OrderCallback = Box<dyn Fn(Order) + Send + Sync>;
pub type OrdersCallback = Box<dyn Fn(Vec<Order>) + Send + Sync>;
pub type PositionCallback = Box<dyn Fn(Position) + Send + Sync>;
pub type PositionsCallback = Box<dyn Fn(Vec<Position>) + Send + Sync>;
pub type MarginInfoCallback = Box<dyn Fn(MarginInfo) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(String) + Send + Sync>;
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// Market data / account streaming client.
///
/// Callbacks registered before `open()` fire for every matching message
/// after the corresponding channel is subscribed. Registration itself never
/// fails; subscription calls do.
#[async_trait]
pub trait MarketStream: Send + Sync {
    /// Open the underlying connection.
    async fn open(&self) -> ExchangeResult<()>;

    /// Authenticate the open connection; account channels deliver only
    /// after this resolves.
    async fn auth(&self) -> ExchangeResult<()>;

    fn is_open(&self) -> bool;

    async fn subscribe_trades(&self, symbol: &str) -> ExchangeResult<()>;

    /// Subscribe a candle channel by key (`trade:<tf>:<symbol>`).
    async fn subscribe_candles(&self, key: &str) -> ExchangeResult<()>;

    async fn subscribe_order_book(
        &self,
        symbol: &str,
        precision: &str,
        len: u32,
    ) -> ExchangeResult<()>;

    fn on_public_trade(&self, symbol: &str, cb: TradeCallback);
    fn on_account_trade_entry(&self, cb: AccountTradeCallback);
    fn on_account_trade_update(&self, cb: AccountTradeCallback);
    fn on_candles(&self, key: &str, cb: CandlesCallback);
    fn on_order_book(&self, symbol: &str, cb: OrderBookCallback);
    fn on_order_snapshot(&self, cb: OrdersCallback);
    fn on_order_new(&self, cb: OrderCallback);
    fn on_order_update(&self, cb: OrderCallback);
    fn on_order_close(&self, cb: OrderCallback);
    fn on_position_snapshot(&self, cb: PositionsCallback);
    fn on_position_new(&self, cb: PositionCallback);
    fn on_position_update(&self, cb: PositionCallback);
    fn on_position_close(&self, cb: PositionCallback);
    fn on_margin_info(&self, cb: MarginInfoCallback);
    fn on_error(&self, cb: ErrorCallback);
    fn on_close(&self, cb: CloseCallback);

    async fn submit_order(&self, order: &Order) -> ExchangeResult<()>;

    async fn update_order(&self, id: u64, price: f64) -> ExchangeResult<()>;

    /// Send a raw payload on the socket; used for batch cancels
    /// (`oc_multi`) which have no dedicated SDK call.
    async fn send_raw(&self, payload: serde_json::Value) -> ExchangeResult<()>;

    /// Request margin/position calc updates for the given keys.
    fn request_calc(&self, keys: &[String]);
}
