//! Exchange SDK boundary
//!
//! The actual exchange protocol lives in a vendor SDK; this module defines
//! the traits and value types the terminal consumes, plus in-memory doubles
//! for offline operation and tests.

pub mod errors;
pub mod rest;
pub mod sim;
pub mod stream;
pub mod types;

pub use errors::{ExchangeError, ExchangeResult};
pub use rest::RestClient;
pub use sim::{SimRest, SimStream};
pub use stream::MarketStream;
pub use types::{
    AccountTrade, BookLevel, Candle, MarginInfo, MarketInfo, Order, OrderBook, OrderRequest,
    OrderStatus, OrderType, PairConfig, Position, PositionStatus, PublicTrade, SymbolDetails,
};
