//! REST client interface consumed by the data plugins

use async_trait::async_trait;

use crate::exchange::errors::ExchangeResult;
use crate::exchange::types::{MarginInfo, PairConfig, SymbolDetails};

/// The small REST surface the terminal needs: initial margin info plus the
/// static market configuration for a symbol.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn margin_info(&self) -> ExchangeResult<MarginInfo>;

    async fn pair_config(&self, symbol: &str) -> ExchangeResult<PairConfig>;

    async fn symbol_details(&self, symbol: &str) -> ExchangeResult<SymbolDetails>;
}
