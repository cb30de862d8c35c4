//! Order commands: buy, sell, cancel

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use async_trait::async_trait;

use crate::commands::{builder, Command, CommandUsage};
use crate::exchange::types::OrderRequest;
use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::data::orders::OrdersApi;

/// Resolve the order size from an optional argument, falling back to the
/// quick order size.
fn resolve_size(arg: Option<&&str>, quick: f64) -> anyhow::Result<f64> {
    let size = match arg {
        Some(raw) => {
            let parsed: f64 = raw.parse().with_context(|| format!("size not a number: {raw}"))?;
            if parsed <= 0.0 {
                bail!("size must be positive");
            }
            parsed
        }
        None => quick,
    };

    if size <= 0.0 {
        bail!("order size required (pass a size or set orders.quick-size)");
    }

    Ok(size)
}

async fn submit_market(
    host: &Arc<ModuleHost>,
    args: &[&str],
    direction: f64,
    label: &str,
) -> anyhow::Result<()> {
    let orders = host.capability::<dyn OrdersApi>()?;
    let log = host.capability::<dyn LogApi>()?;

    let size = resolve_size(args.first(), orders.quick_order_size())?;
    let started = Instant::now();

    orders
        .submit_order(OrderRequest::market(host.symbol(), direction * size))
        .await?;

    log.log_output(&format!(
        "{label} submitted (in {}ms)",
        started.elapsed().as_millis()
    ))
    .await;
    Ok(())
}

/// Execute a market buy; quick order size used by default.
pub struct BuyCommand {
    core: ModuleCore,
}

impl BuyCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("orders:buy")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:data:orders")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for BuyCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for BuyCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "buy",
            aliases: &["b"],
            usage: "buy [size]",
            summary: "Execute a market buy; quick order size used by default",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        submit_market(host, args, 1.0, "buy").await
    }
}

/// Execute a market sell; quick order size used by default.
pub struct SellCommand {
    core: ModuleCore,
}

impl SellCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("orders:sell")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:data:orders")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for SellCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for SellCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "sell",
            aliases: &["s"],
            usage: "sell [size]",
            summary: "Execute a market sell; quick order size used by default",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        submit_market(host, args, -1.0, "sell").await
    }
}

/// Cancel an order by session ID, or all active orders.
pub struct CancelCommand {
    core: ModuleCore,
}

impl CancelCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("orders:cancel")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:data:orders")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for CancelCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for CancelCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "cancel",
            aliases: &["cc"],
            usage: "cancel [id|all]",
            summary: "Cancel an order by session ID; cancels all active orders if none given",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        let orders = host.capability::<dyn OrdersApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        let ids = match args.first() {
            None | Some(&"all") => orders.active_order_ids(),
            Some(raw) => {
                let id: usize = raw
                    .parse()
                    .with_context(|| format!("order ID not a number: {raw}"))?;
                vec![id]
            }
        };

        if ids.is_empty() {
            log.log_output("no orders to cancel").await;
            return Ok(());
        }

        orders.cancel_orders_by_id(&ids).await?;

        let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        log.log_output(&format!(
            "canceled {} orders: {}",
            ids.len(),
            rendered.join(", ")
        ))
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::dispatch;
    use crate::commands::tests::booted_host;
    use crate::plugins::core::settings::SettingsApi;
    use crate::plugins::data::orders::QUICK_SIZE_SETTING;
    use crate::settings::SettingValue;

    #[test]
    fn test_resolve_size_validation() {
        assert_eq!(resolve_size(Some(&"0.5"), 0.0).unwrap(), 0.5);
        assert_eq!(resolve_size(None, 0.25).unwrap(), 0.25);
        assert!(resolve_size(Some(&"-1"), 0.0).is_err());
        assert!(resolve_size(Some(&"abc"), 0.0).is_err());
        assert!(resolve_size(None, 0.0).is_err());
    }

    #[tokio::test]
    async fn test_buy_and_sell_sign_amounts() {
        let (host, stream) = booted_host().await;

        dispatch(&host, "buy 0.5").await.unwrap();
        dispatch(&host, "sell 0.2").await.unwrap();

        let submitted = stream.submitted_orders();
        assert_eq!(submitted[0].amount, 0.5);
        assert_eq!(submitted[1].amount, -0.2);
    }

    #[tokio::test]
    async fn test_quick_size_fallback() {
        let (host, stream) = booted_host().await;

        // without a size and no quick size the command fails
        assert!(dispatch(&host, "buy").await.is_err());

        host.capability::<dyn SettingsApi>()
            .unwrap()
            .set_setting(QUICK_SIZE_SETTING, SettingValue::Number(0.1))
            .await
            .unwrap();

        dispatch(&host, "buy").await.unwrap();
        assert_eq!(stream.submitted_orders()[0].amount, 0.1);
    }

    #[tokio::test]
    async fn test_cancel_all_active_orders() {
        let (host, stream) = booted_host().await;

        dispatch(&host, "buy 0.5").await.unwrap();
        dispatch(&host, "buy 0.6").await.unwrap();
        dispatch(&host, "cancel").await.unwrap();

        assert_eq!(stream.raw_sends().len(), 1);
        assert_eq!(stream.raw_sends()[0][1], "oc_multi");
    }

    #[tokio::test]
    async fn test_cancel_with_no_orders_is_a_noop() {
        let (host, stream) = booted_host().await;

        dispatch(&host, "cancel all").await.unwrap();
        assert!(stream.raw_sends().is_empty());
    }
}
