//! Meta commands: clear, list-executable

use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::{builder, Command, CommandUsage};
use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;

/// Clear the console output.
pub struct ClearCommand {
    core: ModuleCore,
}

impl ClearCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("meta:clear")
            .requires_module("plugin:core:logger")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for ClearCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for ClearCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "clear",
            aliases: &[],
            usage: "clear",
            summary: "Clear the console output",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, _args: &[&str]) -> anyhow::Result<()> {
        host.capability::<dyn LogApi>()?.clear_output().await;
        Ok(())
    }
}

/// List every delegated host method and its owning module.
pub struct ListExecutableCommand {
    core: ModuleCore,
}

impl ListExecutableCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("meta:list-executable")
            .requires_module("plugin:core:logger")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for ListExecutableCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for ListExecutableCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "list-executable",
            aliases: &["ls-ex"],
            usage: "list-executable",
            summary: "List all executable host methods",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, _args: &[&str]) -> anyhow::Result<()> {
        let log = host.capability::<dyn LogApi>()?;
        let methods = host.host_methods()?;

        log.log_output("available host methods:").await;

        for (name, method) in methods {
            log.log_output(&format!(
                "  {name} (from {}, {})",
                method.module.decorated(),
                method.kind
            ))
            .await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::dispatch;
    use crate::commands::tests::booted_host;

    #[tokio::test]
    async fn test_meta_commands_run() {
        let (host, _stream) = booted_host().await;

        dispatch(&host, "clear").await.unwrap();
        dispatch(&host, "list-executable").await.unwrap();
        dispatch(&host, "ls-ex").await.unwrap();
    }
}
