//! In-memory exchange doubles
//!
//! `SimStream`/`SimRest` implement the SDK traits without any transport.
//! The binary uses them for offline mode; tests drive the `feed_*` methods
//! to exercise data plugins deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::exchange::errors::{ExchangeError, ExchangeResult};
use crate::exchange::rest::RestClient;
use crate::exchange::stream::{
    AccountTradeCallback, CandlesCallback, CloseCallback, ErrorCallback, MarginInfoCallback,
    MarketStream, OrderBookCallback, OrderCallback, OrdersCallback, PositionCallback,
    PositionsCallback, TradeCallback,
};
use crate::exchange::types::{
    AccountTrade, Candle, MarginInfo, Order, OrderBook, PairConfig, Position, PublicTrade,
    SymbolDetails,
};
use crate::util::lock;

/// Streaming client double: records subscriptions, submitted orders and raw
/// sends; exposes `feed_*` methods that invoke the registered callbacks.
#[derive(Default)]
pub struct SimStream {
    opened: AtomicBool,
    authed: AtomicBool,
    next_order_id: AtomicU64,
    subscriptions: Mutex<Vec<String>>,
    submitted: Mutex<Vec<Order>>,
    raw_sends: Mutex<Vec<serde_json::Value>>,
    calc_requests: Mutex<Vec<Vec<String>>>,

    trade_cbs: Mutex<HashMap<String, Vec<TradeCallback>>>,
    account_trade_entry_cbs: Mutex<Vec<AccountTradeCallback>>,
    account_trade_update_cbs: Mutex<Vec<AccountTradeCallback>>,
    candle_cbs: Mutex<HashMap<String, Vec<CandlesCallback>>>,
    book_cbs: Mutex<HashMap<String, Vec<OrderBookCallback>>>,
    order_snapshot_cbs: Mutex<Vec<OrdersCallback>>,
    order_new_cbs: Mutex<Vec<OrderCallback>>,
    order_update_cbs: Mutex<Vec<OrderCallback>>,
    order_close_cbs: Mutex<Vec<OrderCallback>>,
    position_snapshot_cbs: Mutex<Vec<PositionsCallback>>,
    position_new_cbs: Mutex<Vec<PositionCallback>>,
    position_update_cbs: Mutex<Vec<PositionCallback>>,
    position_close_cbs: Mutex<Vec<PositionCallback>>,
    margin_info_cbs: Mutex<Vec<MarginInfoCallback>>,
    error_cbs: Mutex<Vec<ErrorCallback>>,
    close_cbs: Mutex<Vec<CloseCallback>>,
}

impl SimStream {
    pub fn new() -> Self {
        Self {
            next_order_id: AtomicU64::new(1000),
            ..Self::default()
        }
    }

    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.subscriptions).clone()
    }

    pub fn submitted_orders(&self) -> Vec<Order> {
        lock(&self.submitted).clone()
    }

    pub fn raw_sends(&self) -> Vec<serde_json::Value> {
        lock(&self.raw_sends).clone()
    }

    pub fn calc_requests(&self) -> Vec<Vec<String>> {
        lock(&self.calc_requests).clone()
    }

    pub fn feed_public_trade(&self, symbol: &str, trade: PublicTrade) {
        if let Some(cbs) = lock(&self.trade_cbs).get(symbol) {
            for cb in cbs {
                cb(trade.clone());
            }
        }
    }

    pub fn feed_account_trade_entry(&self, trade: AccountTrade) {
        for cb in lock(&self.account_trade_entry_cbs).iter() {
            cb(trade.clone());
        }
    }

    pub fn feed_account_trade_update(&self, trade: AccountTrade) {
        for cb in lock(&self.account_trade_update_cbs).iter() {
            cb(trade.clone());
        }
    }

    pub fn feed_candles(&self, key: &str, candles: Vec<Candle>) {
        if let Some(cbs) = lock(&self.candle_cbs).get(key) {
            for cb in cbs {
                cb(candles.clone());
            }
        }
    }

    pub fn feed_order_book(&self, symbol: &str, book: OrderBook) {
        if let Some(cbs) = lock(&self.book_cbs).get(symbol) {
            for cb in cbs {
                cb(book.clone());
            }
        }
    }

    pub fn feed_order_snapshot(&self, orders: Vec<Order>) {
        for cb in lock(&self.order_snapshot_cbs).iter() {
            cb(orders.clone());
        }
    }

    pub fn feed_order_new(&self, order: Order) {
        for cb in lock(&self.order_new_cbs).iter() {
            cb(order.clone());
        }
    }

    pub fn feed_order_update(&self, order: Order) {
        for cb in lock(&self.order_update_cbs).iter() {
            cb(order.clone());
        }
    }

    pub fn feed_order_close(&self, order: Order) {
        for cb in lock(&self.order_close_cbs).iter() {
            cb(order.clone());
        }
    }

    pub fn feed_position_snapshot(&self, positions: Vec<Position>) {
        for cb in lock(&self.position_snapshot_cbs).iter() {
            cb(positions.clone());
        }
    }

    pub fn feed_position_new(&self, position: Position) {
        for cb in lock(&self.position_new_cbs).iter() {
            cb(position.clone());
        }
    }

    pub fn feed_position_update(&self, position: Position) {
        for cb in lock(&self.position_update_cbs).iter() {
            cb(position.clone());
        }
    }

    pub fn feed_position_close(&self, position: Position) {
        for cb in lock(&self.position_close_cbs).iter() {
            cb(position.clone());
        }
    }

    pub fn feed_margin_info(&self, info: MarginInfo) {
        for cb in lock(&self.margin_info_cbs).iter() {
            cb(info.clone());
        }
    }

    pub fn feed_error(&self, message: &str) {
        for cb in lock(&self.error_cbs).iter() {
            cb(message.to_string());
        }
    }

    pub fn feed_close(&self) {
        self.opened.store(false, Ordering::SeqCst);
        for cb in lock(&self.close_cbs).iter() {
            cb();
        }
    }

    fn ensure_open(&self) -> ExchangeResult<()> {
        if self.opened.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExchangeError::NotConnected)
        }
    }
}

#[async_trait]
impl MarketStream for SimStream {
    async fn open(&self) -> ExchangeResult<()> {
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn auth(&self) -> ExchangeResult<()> {
        self.ensure_open()?;
        self.authed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    async fn subscribe_trades(&self, symbol: &str) -> ExchangeResult<()> {
        self.ensure_open()?;
        lock(&self.subscriptions).push(format!("trades:{symbol}"));
        Ok(())
    }

    async fn subscribe_candles(&self, key: &str) -> ExchangeResult<()> {
        self.ensure_open()?;
        lock(&self.subscriptions).push(format!("candles:{key}"));
        Ok(())
    }

    async fn subscribe_order_book(
        &self,
        symbol: &str,
        precision: &str,
        len: u32,
    ) -> ExchangeResult<()> {
        self.ensure_open()?;
        lock(&self.subscriptions).push(format!("book:{symbol}:{precision}:{len}"));
        Ok(())
    }

    fn on_public_trade(&self, symbol: &str, cb: TradeCallback) {
        lock(&self.trade_cbs)
            .entry(symbol.to_string())
            .or_default()
            .push(cb);
    }

    fn on_account_trade_entry(&self, cb: AccountTradeCallback) {
        lock(&self.account_trade_entry_cbs).push(cb);
    }

    fn on_account_trade_update(&self, cb: AccountTradeCallback) {
        lock(&self.account_trade_update_cbs).push(cb);
    }

    fn on_candles(&self, key: &str, cb: CandlesCallback) {
        lock(&self.candle_cbs)
            .entry(key.to_string())
            .or_default()
            .push(cb);
    }

    fn on_order_book(&self, symbol: &str, cb: OrderBookCallback) {
        lock(&self.book_cbs)
            .entry(symbol.to_string())
            .or_default()
            .push(cb);
    }

    fn on_order_snapshot(&self, cb: OrdersCallback) {
        lock(&self.order_snapshot_cbs).push(cb);
    }

    fn on_order_new(&self, cb: OrderCallback) {
        lock(&self.order_new_cbs).push(cb);
    }

    fn on_order_update(&self, cb: OrderCallback) {
        lock(&self.order_update_cbs).push(cb);
    }

    fn on_order_close(&self, cb: OrderCallback) {
        lock(&self.order_close_cbs).push(cb);
    }

    fn on_position_snapshot(&self, cb: PositionsCallback) {
        lock(&self.position_snapshot_cbs).push(cb);
    }

    fn on_position_new(&self, cb: PositionCallback) {
        lock(&self.position_new_cbs).push(cb);
    }

    fn on_position_update(&self, cb: PositionCallback) {
        lock(&self.position_update_cbs).push(cb);
    }

    fn on_position_close(&self, cb: PositionCallback) {
        lock(&self.position_close_cbs).push(cb);
    }

    fn on_margin_info(&self, cb: MarginInfoCallback) {
        lock(&self.margin_info_cbs).push(cb);
    }

    fn on_error(&self, cb: ErrorCallback) {
        lock(&self.error_cbs).push(cb);
    }

    fn on_close(&self, cb: CloseCallback) {
        lock(&self.close_cbs).push(cb);
    }

    async fn submit_order(&self, order: &Order) -> ExchangeResult<()> {
        self.ensure_open()?;

        let mut confirmed = order.clone();
        confirmed.id = Some(self.next_order_id.fetch_add(1, Ordering::SeqCst));
        confirmed.status = crate::exchange::types::OrderStatus::Active;
        lock(&self.submitted).push(confirmed.clone());

        self.feed_order_new(confirmed);
        Ok(())
    }

    async fn update_order(&self, id: u64, price: f64) -> ExchangeResult<()> {
        self.ensure_open()?;

        let updated = lock(&self.submitted).iter_mut().find_map(|o| {
            if o.id == Some(id) {
                o.price = Some(price);
                Some(o.clone())
            } else {
                None
            }
        });

        match updated {
            Some(order) => {
                self.feed_order_update(order);
                Ok(())
            }
            None => Err(ExchangeError::OrderRejected(format!("unknown order {id}"))),
        }
    }

    async fn send_raw(&self, payload: serde_json::Value) -> ExchangeResult<()> {
        self.ensure_open()?;
        lock(&self.raw_sends).push(payload);
        Ok(())
    }

    fn request_calc(&self, keys: &[String]) {
        lock(&self.calc_requests).push(keys.to_vec());
    }
}

/// REST client double with configurable canned responses.
pub struct SimRest {
    pub margin: MarginInfo,
    pub pair: PairConfig,
    pub details: SymbolDetails,
}

impl SimRest {
    pub fn new(symbol: &str) -> Self {
        Self {
            margin: MarginInfo {
                user_pl: 0.0,
                user_swaps: 0.0,
                margin_balance: 10_000.0,
                margin_net: 10_000.0,
                margin_required: 0.0,
            },
            pair: PairConfig {
                max_leverage: 10.0,
                min_trade_size: 0.002,
            },
            details: SymbolDetails {
                pair: symbol.trim_start_matches('t').to_lowercase(),
                price_precision: 5,
            },
        }
    }
}

#[async_trait]
impl RestClient for SimRest {
    async fn margin_info(&self) -> ExchangeResult<MarginInfo> {
        Ok(self.margin.clone())
    }

    async fn pair_config(&self, _symbol: &str) -> ExchangeResult<PairConfig> {
        Ok(self.pair.clone())
    }

    async fn symbol_details(&self, _symbol: &str) -> ExchangeResult<SymbolDetails> {
        Ok(self.details.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_subscriptions_require_open() {
        let stream = SimStream::new();
        assert!(stream.subscribe_trades("tBTCUSD").await.is_err());

        stream.open().await.unwrap();
        stream.subscribe_trades("tBTCUSD").await.unwrap();
        assert_eq!(stream.subscriptions(), vec!["trades:tBTCUSD".to_string()]);
    }

    #[tokio::test]
    async fn test_feed_invokes_matching_trade_callbacks_only() {
        let stream = SimStream::new();
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));

        let s = std::sync::Arc::clone(&seen);
        stream.on_public_trade(
            "tBTCUSD",
            Box::new(move |t| lock(&s).push(t.amount)),
        );

        stream.feed_public_trade(
            "tETHUSD",
            PublicTrade {
                id: 1,
                mts: Utc::now(),
                amount: 1.0,
                price: 10.0,
            },
        );
        stream.feed_public_trade(
            "tBTCUSD",
            PublicTrade {
                id: 2,
                mts: Utc::now(),
                amount: -2.0,
                price: 11.0,
            },
        );

        assert_eq!(*lock(&seen), vec![-2.0]);
    }

    #[tokio::test]
    async fn test_submit_assigns_id_and_confirms() {
        let stream = SimStream::new();
        stream.open().await.unwrap();

        let confirmed = std::sync::Arc::new(Mutex::new(Vec::new()));
        let c = std::sync::Arc::clone(&confirmed);
        stream.on_order_new(Box::new(move |o| lock(&c).push(o)));

        let order = Order {
            id: None,
            cid: 7,
            gid: None,
            symbol: "tBTCUSD".into(),
            order_type: crate::exchange::types::OrderType::Market,
            amount: 1.0,
            amount_orig: 1.0,
            price: None,
            price_avg: 0.0,
            status: crate::exchange::types::OrderStatus::Pending,
            mts_create: Utc::now(),
        };

        stream.submit_order(&order).await.unwrap();

        let confirmed = lock(&confirmed);
        assert_eq!(confirmed.len(), 1);
        assert!(confirmed[0].id.is_some());
        assert_eq!(confirmed[0].cid, 7);
    }
}
