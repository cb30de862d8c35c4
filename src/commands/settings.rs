//! Setting commands: set, get, list

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;

use crate::commands::{builder, Command, CommandUsage};
use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::core::settings::SettingsApi;
use crate::settings::SettingValue;

/// Change a setting value.
pub struct SetSettingCommand {
    core: ModuleCore,
}

impl SetSettingCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("settings:set")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:core:settings")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for SetSettingCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for SetSettingCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "set",
            aliases: &[],
            usage: "set <setting> <value>",
            summary: "Set a setting; use 'list' for available settings and 'get' to read one",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        let settings = host.capability::<dyn SettingsApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        let (key, value) = match args {
            [key, rest @ ..] if !rest.is_empty() => (*key, rest.join(" ")),
            _ => bail!("usage: set <setting> <value>"),
        };

        let stored = settings
            .set_setting(key, SettingValue::text(value))
            .await?;

        log.log_output(&format!("setting {key} set to {stored}")).await;
        Ok(())
    }
}

/// Read a setting value.
pub struct GetSettingCommand {
    core: ModuleCore,
}

impl GetSettingCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("settings:get")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:core:settings")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for GetSettingCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for GetSettingCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "get",
            aliases: &[],
            usage: "get <setting>",
            summary: "Read a setting value",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        let settings = host.capability::<dyn SettingsApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        let [key] = args else {
            bail!("usage: get <setting>");
        };

        let rendered = settings
            .get_setting(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<unset>".to_string());

        log.log_output(&format!("'{key}' = {rendered}")).await;
        Ok(())
    }
}

/// List settings with descriptions and current values.
pub struct ListSettingsCommand {
    core: ModuleCore,
}

impl ListSettingsCommand {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = builder("settings:list")
            .requires_module("plugin:core:logger")
            .requires_module("plugin:core:settings")
            .attach(host)?;

        let command = Arc::new(Self { core });
        host.register_command(Arc::clone(&command) as Arc<dyn Command>);
        Ok(command)
    }
}

impl Module for ListSettingsCommand {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl Command for ListSettingsCommand {
    fn usage(&self) -> CommandUsage {
        CommandUsage {
            name: "list",
            aliases: &["ls"],
            usage: "list [namespace]",
            summary: "View configurable settings and their values",
        }
    }

    async fn run(&self, host: &Arc<ModuleHost>, args: &[&str]) -> anyhow::Result<()> {
        let settings = host.capability::<dyn SettingsApi>()?;
        let log = host.capability::<dyn LogApi>()?;

        log.log_output("configurable settings:").await;

        for key in settings.list_settings(args.first().copied()) {
            let info = settings.setting_info(&key)?;
            let value = info
                .value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<unset>".to_string());

            let choices = if info.choices.is_empty() {
                String::new()
            } else {
                let rendered: Vec<String> =
                    info.choices.iter().map(|c| c.to_string()).collect();
                format!(" [choices {}]", rendered.join(", "))
            };

            log.log_output(&format!(
                "  {key}: {} ({value}){choices}",
                info.description
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
    use crate::plugins::core::settings::SettingsApi;
    use crate::settings::SettingValue;

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let (host, _stream) = booted_host().await;

        dispatch(&host, "set orders.quick-size 0.75").await.unwrap();

        let settings = host.capability::<dyn SettingsApi>().unwrap();
        assert_eq!(
            settings.get_setting("orders.quick-size"),
            Some(SettingValue::Number(0.75))
        );

        dispatch(&host, "get orders.quick-size").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_values() {
        let (host, _stream) = booted_host().await;

        let err = dispatch(&host, "set orders.quick-size bananas")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed validation"), "got: {err}");
    }

    #[tokio::test]
    async fn test_set_requires_key_and_value() {
        let (host, _stream) = booted_host().await;
        assert!(dispatch(&host, "set orders.quick-size").await.is_err());
    }

    #[tokio::test]
    async fn test_list_runs_over_defined_settings() {
        let (host, _stream) = booted_host().await;
        dispatch(&host, "list").await.unwrap();
        dispatch(&host, "list alerts").await.unwrap();
    }
}
