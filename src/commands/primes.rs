//! Prime rule commands: prime, rm-prime

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::commands::{builder, Command, CommandUsage};
use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::meta::primes::{PrimeRule, PrimesApi};

/// Parse a time-in-force argument like `20s`, `5m` or `1h`.
fn parse_tif(raw: &str) -> anyhow::Result<Duration> {
    let (value, unit) = raw.split_at(raw.len().saturating_sub(1));
    let value: i64 = value
        .parse()
        .with_context(|| format!("TIF duration not a number: {raw}"))?;

    match unit {
        "s" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" => Ok(Duration::hours(value)),
        other => bail!("unknown TIF unit: {other}"),
    }
}

/// Arm an order to fire when a metric crosses a threshold.
pub struct PrimeCommand {
    core: ModuleCore,
}

impl PrimeCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("primes:prime")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:meta:primes")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for PrimeCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for PrimeCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "prime",
            aliases: &[],
            usage: "prime <type> <threshold> [amount] [tif]",
            summary: "Schedule an order to fire when the metric type exceeds a threshold",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        let primes = host.capability::<dyn PrimesApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        let [rule_type, threshold, rest @ ..] = args else {
            bail!("usage: prime <type> <threshold> [amount] [tif]");
        };

        let rule_type = rule_type.parse()?;
        let threshold: f64 = threshold
            .parse()
            .with_context(|| format!("threshold not a number: {threshold}"))?;

        let amount = match rest.first() {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .with_context(|| format!("amount not a number: {raw}"))?,
            ),
            None => None,
        };

        let expires_at = match rest.get(1) {
            Some(raw) => Some(Utc::now() + parse_tif(raw)?),
            None => None,
        };

        primes.setup_prime(PrimeRule {
            rule_type,
            threshold,
            amount,
            expires_at,
        })?;

        log.log_output(&format!(
            "primed to trade on {rule_type} with threshold {threshold} (amount {}, tif {})",
            amount.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
            rest.get(1).copied().unwrap_or("-"),
        ))
        .await;
        Ok(())
    }
}

/// Remove a prime rule by ID.
pub struct RmPrimeCommand {
    core: ModuleCore,
}

impl RmPrimeCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("primes:rm-prime")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:meta:primes")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for RmPrimeCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for RmPrimeCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "rm-prime",
            aliases: &["rp", "del-prime"],
            usage: "rm-prime <id>",
            summary: "Remove a prime rule by ID",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        let primes = host.capability::<dyn PrimesApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        let [id] = args else {
            bail!("usage: rm-prime <id>");
        };
        let id: usize = id.parse().with_context(|| format!("ID not a number: {id}"))?;

        if primes.delete_prime(id) {
            log.log_output(&format!("deleted prime rule {id}")).await;
        } else {
            log.log_output(&format!("no such prime rule: {id}")).await;
        }

        Ok(())
    }
}
