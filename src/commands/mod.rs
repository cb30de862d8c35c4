//! Console commands
//!
//! Commands are modules in the `command:` namespace that call host
//! capabilities; they carry usage metadata for help listings and are
//! routed by name or alias. Full argument parsing is the console layer's
//! job — handlers receive a pre-split token list.

pub mod meta;
pub mod orders;
pub mod positions;
pub mod primes;
pub mod settings;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;

use crate::host::module::{Module, ModuleBuilder};
use crate::host::module_host::ModuleHost;

pub use meta::{ClearCommand, ListExecutableCommand};
pub use orders::{BuyCommand, CancelCommand, SellCommand};
pub use positions::ExitCommand;
pub use primes::{PrimeCommand, RmPrimeCommand};
pub use settings::{GetSettingCommand, ListSettingsCommand, SetSettingCommand};

/// Usage metadata shown by help listings.
#[derive(Debug, Clone, Copy)]
pub struct CommandUsage {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub summary: &'static str,
}

#[async_trait]
pub trait Command: Module {
    fn usage(&self) -> CommandUsage;

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()>;
}

/// Builder for command modules: IDs live under `command:` and commands are
/// host singletons.
pub(crate) fn builder(id: &str) -> ModuleBuilder {
    ModuleBuilder::new(format!("command:{id}")).unique()
}

/// Route a console line to the matching command by name or alias.
pub async fn dispatch(host: &Arc<ModuleHost>, line: &str) -> anyhow::Result<()> {
    let mut tokens = line.split_whitespace();

    let Some(name) = tokens.next() else {
        return Ok(());
    };
    let args: Vec<&str> = tokens.collect();

    let command = host.commands().into_iter().find(|command| {
        let usage = command.usage();
        usage.name == name || usage.aliases.contains(&name)
    });

    match command {
        Some(command) => command.run(host, &args).await,
        None => bail!("unknown command: {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{build_host, HostDeps};
    use crate::config::AppConfig;
    use crate::exchange::sim::{SimRest, SimStream};
    use crate::plugins::core::notifications::TracingSink;

    pub(crate) async fn booted_host() -> (Arc<ModuleHost>, Arc<SimStream>) {
        let stream = Arc::new(SimStream::new());
        let config = AppConfig {
            symbol: "tBTCUSD".to_string(),
            api_key: None,
            api_secret: None,
        };

        let host = build_host(
            &config,
            HostDeps {
                stream: Arc::clone(&stream) as _,
                rest: Arc::new(SimRest::new("tBTCUSD")),
                sink: Arc::new(TracingSink),
            },
        )
        .unwrap();

        host.boot().await.unwrap();
        (host, stream)
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_name_and_alias() {
        let (host, stream) = booted_host().await;

        dispatch(&host, "buy 0.5").await.unwrap();
        dispatch(&host, "b 0.25").await.unwrap();
        assert_eq!(stream.submitted_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_unknown_commands() {
        let (host, _stream) = booted_host().await;

        let err = dispatch(&host, "frobnicate 1 2 3").await.unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }

    #[tokio::test]
    async fn test_dispatch_ignores_empty_lines() {
        let (host, _stream) = booted_host().await;
        dispatch(&host, "   ").await.unwrap();
    }
}
