//! Settings plugin
//!
//! Exposes the setting registry as a host capability so plugins and
//! commands can be configured after creation. The registry itself lives in
//! `crate::settings`; this module only wires it onto the host.

use std::sync::Arc;

use async_trait::async_trait;

use crate::host::error::ModuleAddError;
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::settings::{
    SettingDefinition, SettingInfo, SettingListener, SettingRegistry, SettingSubscription,
    SettingValue, SettingsError,
};

/// Shared runtime settings capability.
#[async_trait]
pub trait SettingsApi: Send + Sync {
    fn define_setting(&self, definition: SettingDefinition) -> Result<(), SettingsError>;

    fn get_setting(&self, key: &str) -> Option<SettingValue>;

    fn setting_info(&self, key: &str) -> Result<SettingInfo, SettingsError>;

    fn list_settings(&self, namespace: Option<&str>) -> Vec<String>;

    /// Pre-flight a raw value; returns the validation failure message, if
    /// any, without committing.
    fn validate_setting(
        &self,
        key: &str,
        raw: &SettingValue,
    ) -> Result<Option<String>, SettingsError>;

    async fn set_setting(
        &self,
        key: &str,
        raw: SettingValue,
    ) -> Result<SettingValue, SettingsError>;

    async fn remove_setting(&self, key: &str) -> Result<(), SettingsError>;

    async fn clear_settings(&self);

    fn subscribe_setting(
        &self,
        key: &str,
        listener: SettingListener,
    ) -> Result<SettingSubscription, SettingsError>;

    fn unsubscribe_setting(
        &self,
        key: &str,
        subscription: SettingSubscription,
    ) -> Result<(), SettingsError>;
}

pub struct SettingsPlugin {
    core: ModuleCore,
    registry: SettingRegistry,
}

impl SettingsPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let core = Plugin::builder("core:settings")
            .host_methods(&[
                "define_setting",
                "get_setting",
                "setting_info",
                "list_settings",
                "validate_setting",
                "subscribe_setting",
                "unsubscribe_setting",
            ])
            .async_host_methods(&["set_setting", "remove_setting", "clear_settings"])
            .attach(host)?;

        let plugin = Arc::new(Self {
            core,
            registry: SettingRegistry::new(),
        });
        host.provide::<dyn SettingsApi>(plugin.id(), Arc::clone(&plugin) as Arc<dyn SettingsApi>)?;
        Ok(plugin)
    }
}

impl Module for SettingsPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl SettingsApi for SettingsPlugin {
    fn define_setting(&self, definition: SettingDefinition) -> Result<(), SettingsError> {
        self.registry.define(definition)
    }

    fn get_setting(&self, key: &str) -> Option<SettingValue> {
        self.registry.get(key)
    }

    fn setting_info(&self, key: &str) -> Result<SettingInfo, SettingsError> {
        self.registry.info(key)
    }

    fn list_settings(&self, namespace: Option<&str>) -> Vec<String> {
        self.registry.list(namespace)
    }

    fn validate_setting(
        &self,
        key: &str,
        raw: &SettingValue,
    ) -> Result<Option<String>, SettingsError> {
        self.registry.validate_value(key, raw)
    }

    async fn set_setting(
        &self,
        key: &str,
        raw: SettingValue,
    ) -> Result<SettingValue, SettingsError> {
        self.registry.set(key, raw).await
    }

    async fn remove_setting(&self, key: &str) -> Result<(), SettingsError> {
        self.registry.remove(key).await
    }

    async fn clear_settings(&self) {
        self.registry.clear().await
    }

    fn subscribe_setting(
        &self,
        key: &str,
        listener: SettingListener,
    ) -> Result<SettingSubscription, SettingsError> {
        self.registry.subscribe(key, listener)
    }

    fn unsubscribe_setting(
        &self,
        key: &str,
        subscription: SettingSubscription,
    ) -> Result<(), SettingsError> {
        self.registry.unsubscribe(key, subscription)
    }
}
