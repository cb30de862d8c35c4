//! Position commands: exit

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::commands::{builder, Command, CommandUsage};
use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::data::orders::OrdersApi;
use crate::plugins::data::positions::PositionsApi;

/// Close the currently open position; does nothing if none is open.
pub struct ExitCommand {
    core: ModuleCore,
}

impl ExitCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("positions:exit")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:data:orders")
            .requires_module("plugin:data:positions")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for ExitCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for ExitCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "exit",
            aliases: &["close", "e"],
            usage: "exit",
            summary: "Close the currently open position",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, _args: &[&str]) -> anyhow::Result<()> {
        let positions = host.capability::<dyn PositionsApi>()?;
        let orders = host.capability::<dyn OrdersApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        let Some(position) = positions.position() else {
            log.log_output("no position to close").await;
            return Ok(());
        };

        let started = Instant::now();
        orders.submit_order(position.order_to_close()).await?;

        log.log_output(&format!(
            "position closed (in {}ms)",
            started.elapsed().as_millis()
        ))
        .await;
        Ok(())
    }
}
