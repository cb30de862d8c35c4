//! Feed plugins: subscribe exchange channels and propagate typed hooks

pub mod candles;
pub mod margin_info;
pub mod market_info;
pub mod order_books;
pub mod orders;
pub mod positions;
pub mod trades;

pub use candles::{CandlesApi, CandlesPlugin, TIME_FRAMES};
pub use margin_info::{MarginInfoApi, MarginInfoPlugin};
pub use market_info::{MarketInfoApi, MarketInfoPlugin};
pub use order_books::OrderBooksPlugin;
pub use orders::{OrdersApi, OrdersPlugin, QUICK_SIZE_SETTING};
pub use positions::{PositionsApi, PositionsPlugin};
pub use trades::TradesPlugin;
