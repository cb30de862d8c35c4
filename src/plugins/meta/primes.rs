//! Prime rule plugin
//!
//! A prime rule arms the terminal to fire a market order when a live metric
//! crosses a threshold: individual trade size, or accumulated trade group
//! size. Rules can expire, and a triggered rule clears the whole rule set
//! since the reasoning behind the remaining rules is unlikely to still
//! hold.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};

use crate::exchange::types::OrderRequest;
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::core::notifications::NotificationsApi;
use crate::plugins::data::orders::OrdersApi;
use crate::util::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimeRuleType {
    Size,
    GroupSize,
}

impl fmt::Display for PrimeRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => write!(f, "size"),
            Self::GroupSize => write!(f, "group-size"),
        }
    }
}

impl FromStr for PrimeRuleType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "size" => Ok(Self::Size),
            "group-size" => Ok(Self::GroupSize),
            other => bail!("unknown prime type: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimeRule {
    pub rule_type: PrimeRuleType,
    /// Signed threshold; negative thresholds arm on sells
    pub threshold: f64,
    /// Order size on trigger; the signed quick order size when absent
    pub amount: Option<f64>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PrimeRule {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }

    fn crossed(&self, value: f64) -> bool {
        (self.threshold > 0.0 && value >= self.threshold)
            || (self.threshold < 0.0 && value <= self.threshold)
    }
}

/// Prime rule management capability.
pub trait PrimesApi: Send + Sync {
    /// Arm a new rule; a rule with the same type and threshold may not
    /// already exist.
    fn setup_prime(&self, rule: PrimeRule) -> anyhow::Result<()>;

    /// Remove a rule by ID; false if no such rule.
    fn delete_prime(&self, id: usize) -> bool;

    fn prime_ids(&self) -> Vec<usize>;

    fn rules(&self) -> Vec<PrimeRule>;
}

#[derive(Default)]
struct PrimesState {
    rules: Mutex<Vec<PrimeRule>>,
    buy_group: Mutex<f64>,
    sell_group: Mutex<f64>,
}

pub struct PrimesPlugin {
    core: ModuleCore,
    state: Arc<PrimesState>,
}

impl PrimesPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let state = Arc::new(PrimesState::default());

        let weak = Arc::downgrade(host);
        let trade_state = Arc::clone(&state);
        let buy_state = Arc::clone(&state);
        let sell_state = Arc::clone(&state);

        let core = Plugin::builder("meta:primes")
            .requires_module("plugin:data:trades")
            .requires_module("plugin:data:orders")
            .requires_module("plugin:core:notifications")
            .requires_module("plugin:core:logger")
            .provides_hook(hooks::PRIME_TRIGGERED)
            .host_methods(&["setup_prime", "delete_prime", "prime_ids"])
            .on(hooks::DATA_BUY_TRADE_GROUP, move |data| {
                let state = Arc::clone(&buy_state);
                Box::pin(async move {
                    if let HookData::TradeGroup(group) = data {
                        *lock(&state.buy_group) = group.amount;
                    }
                    Ok(())
                })
            })
            .on(hooks::DATA_SELL_TRADE_GROUP, move |data| {
                let state = Arc::clone(&sell_state);
                Box::pin(async move {
                    if let HookData::TradeGroup(group) = data {
                        *lock(&state.sell_group) = group.amount;
                    }
                    Ok(())
                })
            })
            .on(hooks::DATA_TRADE, move |data| {
                let weak = weak.clone();
                let state = Arc::clone(&trade_state);
                Box::pin(async move {
                    let HookData::Trade { trade, .. } = data else {
                        return Ok(());
                    };

                    let host = weak.upgrade().context("module host dropped")?;
                    let log = host.capability::<dyn LogApi>()?;
                    let now = Utc::now();

                    // drop expired rules before evaluating
                    let expired: Vec<PrimeRule> = {
                        let mut rules = lock(&state.rules);
                        let stale: Vec<PrimeRule> = rules
                            .iter()
                            .filter(|r| r.is_expired(now))
                            .cloned()
                            .collect();
                        rules.retain(|r| !r.is_expired(now));
                        stale
                    };

                    for rule in expired {
                        log.log_info(&format!(
                            "prime rule expired ({} threshold {})",
                            rule.rule_type, rule.threshold
                        ))
                        .await;
                    }

                    let triggered = {
                        let buy_group = *lock(&state.buy_group);
                        let sell_group = *lock(&state.sell_group);
                        let rules = lock(&state.rules);

                        rules
                            .iter()
                            .find(|rule| match rule.rule_type {
                                PrimeRuleType::Size => rule.crossed(trade.amount),
                                PrimeRuleType::GroupSize => {
                                    rule.crossed(if rule.threshold > 0.0 {
                                        buy_group
                                    } else {
                                        sell_group
                                    })
                                }
                            })
                            .cloned()
                    };

                    let Some(rule) = triggered else {
                        return Ok(());
                    };

                    let orders = host.capability::<dyn OrdersApi>()?;
                    let notifications = host.capability::<dyn NotificationsApi>()?;

                    notifications
                        .notify_important(
                            "Prime Trigger",
                            &format!(
                                "rule ({}) triggered: {} {} {}",
                                rule.rule_type,
                                trade.amount,
                                if rule.threshold < 0.0 { "<=" } else { ">=" },
                                rule.threshold
                            ),
                        )
                        .await;

                    let amount = rule.amount.unwrap_or_else(|| {
                        let quick = orders.quick_order_size();
                        if rule.threshold < 0.0 {
                            -quick
                        } else {
                            quick
                        }
                    });

                    orders
                        .submit_order(OrderRequest::market(host.symbol(), amount))
                        .await?;

                    host.emit(
                        hooks::PRIME_TRIGGERED,
                        HookData::Json(serde_json::json!({
                            "type": rule.rule_type.to_string(),
                            "threshold": rule.threshold,
                            "amount": amount,
                        })),
                    )
                    .await;

                    // a fired prime invalidates the reasoning behind the rest
                    lock(&state.rules).clear();
                    Ok(())
                })
            })
            .attach(host)?;

        let plugin = Arc::new(Self { core, state });
        host.provide::<dyn PrimesApi>(plugin.id(), Arc::clone(&plugin) as Arc<dyn PrimesApi>)?;
        Ok(plugin)
    }
}

impl Module for PrimesPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

impl PrimesApi for PrimesPlugin {
    fn setup_prime(&self, rule: PrimeRule) -> anyhow::Result<()> {
        let mut rules = lock(&self.state.rules);

        if rules
            .iter()
            .any(|r| r.rule_type == rule.rule_type && r.threshold == rule.threshold)
        {
            bail!(
                "prime rule already exists for type {} with threshold {}",
                rule.rule_type,
                rule.threshold
            );
        }

        rules.push(rule);
        Ok(())
    }

    fn delete_prime(&self, id: usize) -> bool {
        let mut rules = lock(&self.state.rules);

        if id < rules.len() {
            rules.remove(id);
            true
        } else {
            false
        }
    }

    fn prime_ids(&self) -> Vec<usize> {
        (0..lock(&self.state.rules).len()).collect()
    }

    fn rules(&self) -> Vec<PrimeRule> {
        lock(&self.state.rules).clone()
    }
}
