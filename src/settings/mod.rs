//! Runtime setting registry
//!
//! Typed key/value store shared by all modules on a host: namespaced keys,
//! per-setting transform/validate/choice pipeline, and ordered subscriber
//! notification on every successful update and on removal.

mod registry;
mod types;

pub use registry::SettingRegistry;
pub use types::{
    SettingDefinition, SettingInfo, SettingKind, SettingListener, SettingSubscription,
    SettingUpdate, SettingValue, SettingsError,
};
