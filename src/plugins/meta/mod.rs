//! Derived-data plugins: trade groups and prime rules

pub mod primes;
pub mod trade_groups;

pub use primes::{PrimeRule, PrimeRuleType, PrimesApi, PrimesPlugin};
pub use trade_groups::TradeGroupsPlugin;
