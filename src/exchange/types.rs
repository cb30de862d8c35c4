//! Value types crossing the exchange SDK boundary
//!
//! These mirror what the vendor streaming/REST clients deliver; wire-level
//! parsing happens on the vendor side, the client only consumes typed data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A public trade on a market channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTrade {
    pub id: u64,
    pub mts: DateTime<Utc>,
    /// Signed size; negative amounts are sells
    pub amount: f64,
    pub price: f64,
}

/// A trade executed against the authenticated account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTrade {
    pub id: u64,
    pub order_id: u64,
    pub symbol: String,
    pub mts: DateTime<Utc>,
    pub exec_amount: f64,
    pub exec_price: f64,
    pub fee: f64,
    pub maker: bool,
}

/// A single OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub mts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One price level of a managed order book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub count: u32,
    /// Signed size; negative amounts sit on the ask side
    pub amount: f64,
}

/// Managed order book snapshot, best levels first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn top_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn top_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    pub fn mid_price(&self) -> Option<f64> {
        match (self.top_bid(), self.top_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<f64> {
        match (self.top_bid(), self.top_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Submitted, no confirmation yet
    Pending,
    Active,
    PartiallyFilled,
    Executed,
    Canceled,
}

/// Parameters for a new order submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    /// Signed size; negative amounts sell
    pub amount: f64,
    pub price: Option<f64>,
    pub post_only: bool,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, amount: f64) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Market,
            amount,
            price: None,
            post_only: false,
        }
    }

    pub fn limit(symbol: impl Into<String>, amount: f64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
            post_only: false,
        }
    }
}

/// An account order with its lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Exchange-assigned ID; received on confirmation
    pub id: Option<u64>,
    /// Client order ID, assigned locally before submission
    pub cid: u64,
    /// Group ID shared between all orders of one client session
    pub gid: Option<Uuid>,
    pub symbol: String,
    pub order_type: OrderType,
    /// Remaining signed size
    pub amount: f64,
    /// Original signed size
    pub amount_orig: f64,
    pub price: Option<f64>,
    /// Average fill price; 0 until the first fill
    pub price_avg: f64,
    pub status: OrderStatus,
    pub mts_create: DateTime<Utc>,
}

impl Order {
    /// An order is active while it has remaining size and is neither
    /// executed nor canceled.
    pub fn is_active(&self) -> bool {
        self.amount != 0.0
            && !matches!(self.status, OrderStatus::Executed | OrderStatus::Canceled)
    }

    /// Fill price if any fills happened, otherwise the requested price.
    pub fn effective_price(&self) -> f64 {
        if self.price_avg == 0.0 {
            self.price.unwrap_or(0.0)
        } else {
            self.price_avg
        }
    }

    pub fn notional(&self) -> f64 {
        self.amount_orig * self.effective_price()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Active,
    Closed,
}

/// An open margin position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub status: PositionStatus,
    /// Signed size; negative amounts are short
    pub amount: f64,
    pub base_price: f64,
    pub pl: f64,
    pub pl_perc: f64,
    pub liq_price: Option<f64>,
}

impl Position {
    /// Market order request that would flatten this position.
    pub fn order_to_close(&self) -> OrderRequest {
        OrderRequest::market(self.symbol.clone(), -self.amount)
    }
}

/// Base margin account information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginInfo {
    pub user_pl: f64,
    pub user_swaps: f64,
    pub margin_balance: f64,
    pub margin_net: f64,
    pub margin_required: f64,
}

/// Static market configuration for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub symbol: String,
    pub max_leverage: f64,
    pub min_trade_size: f64,
    pub price_precision: u32,
}

/// Pair configuration as delivered by the REST client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub max_leverage: f64,
    pub min_trade_size: f64,
}

/// Symbol details as delivered by the REST client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDetails {
    pub pair: String,
    pub price_precision: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(amount: f64, status: OrderStatus) -> Order {
        Order {
            id: Some(1),
            cid: 10,
            gid: None,
            symbol: "tBTCUSD".into(),
            order_type: OrderType::Limit,
            amount,
            amount_orig: 2.0,
            price: Some(100.0),
            price_avg: 0.0,
            status,
            mts_create: Utc::now(),
        }
    }

    #[test]
    fn test_order_activity() {
        assert!(order(1.0, OrderStatus::Active).is_active());
        assert!(order(1.0, OrderStatus::PartiallyFilled).is_active());
        assert!(!order(0.0, OrderStatus::Active).is_active());
        assert!(!order(1.0, OrderStatus::Canceled).is_active());
        assert!(!order(1.0, OrderStatus::Executed).is_active());
    }

    #[test]
    fn test_effective_price_prefers_avg() {
        let mut o = order(1.0, OrderStatus::PartiallyFilled);
        assert_eq!(o.effective_price(), 100.0);
        o.price_avg = 101.5;
        assert_eq!(o.effective_price(), 101.5);
    }

    #[test]
    fn test_book_tops_and_mid() {
        let book = OrderBook {
            bids: vec![BookLevel {
                price: 99.0,
                count: 2,
                amount: 1.5,
            }],
            asks: vec![BookLevel {
                price: 101.0,
                count: 1,
                amount: -0.5,
            }],
        };
        assert_eq!(book.top_bid(), Some(99.0));
        assert_eq!(book.top_ask(), Some(101.0));
        assert_eq!(book.mid_price(), Some(100.0));
        assert_eq!(book.spread(), Some(2.0));
    }

    #[test]
    fn test_position_close_request_inverts_amount() {
        let position = Position {
            symbol: "tBTCUSD".into(),
            status: PositionStatus::Active,
            amount: -0.4,
            base_price: 100.0,
            pl: 0.0,
            pl_perc: 0.0,
            liq_price: None,
        };

        let req = position.order_to_close();
        assert_eq!(req.amount, 0.4);
        assert_eq!(req.order_type, OrderType::Market);
    }
}
