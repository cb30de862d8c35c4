//! Notifications plugin
//!
//! Routes notification hooks to an injected delivery sink, gated by the
//! `core.notifications-enabled` setting. Actual desktop delivery lives
//! outside this crate; a tracing-backed sink ships for development and
//! tests.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData, Notification, NotificationLevel};
use crate::host::module::{HookFuture, Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::core::settings::SettingsApi;
use crate::settings::{SettingDefinition, SettingUpdate, SettingValue, SettingsError};

pub const NOTIFICATIONS_ENABLED_SETTING: &str = "core.notifications-enabled";

/// Delivery endpoint for notifications that made it past the enabled gate.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Sink that writes notifications to the tracing log.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            target: "term::notify",
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}

#[async_trait]
pub trait NotificationsApi: Send + Sync {
    async fn notify(&self, title: &str, message: &str);
    async fn notify_success(&self, title: &str, message: &str);
    async fn notify_error(&self, title: &str, message: &str);
    async fn notify_important(&self, title: &str, message: &str);

    fn notifications_enabled(&self) -> bool;

    async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), SettingsError>;
}

pub struct NotificationsPlugin {
    core: ModuleCore,
    settings: Arc<dyn SettingsApi>,
}

impl NotificationsPlugin {
    pub fn build(
        host: &Arc<ModuleHost>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Arc<Self>, ModuleAddError> {
        let settings = host.capability::<dyn SettingsApi>()?;

        let mut builder = Plugin::builder("core:notifications")
            .requires_module("plugin:core:settings")
            .provides_hook(hooks::NOTIFY_GENERIC)
            .provides_hook(hooks::NOTIFY_SUCCESS)
            .provides_hook(hooks::NOTIFY_ERROR)
            .provides_hook(hooks::NOTIFY_IMPORTANT)
            .provides_hook(hooks::NOTIFY_ENABLED_CHANGED)
            .host_methods(&["notifications_enabled"])
            .async_host_methods(&[
                "notify",
                "notify_success",
                "notify_error",
                "notify_important",
                "set_notifications_enabled",
            ]);

        for hook in [
            hooks::NOTIFY_GENERIC,
            hooks::NOTIFY_SUCCESS,
            hooks::NOTIFY_ERROR,
            hooks::NOTIFY_IMPORTANT,
        ] {
            builder = builder.on(
                hook,
                delivery_handler(Arc::clone(&settings), Arc::clone(&sink)),
            );
        }

        let core = builder.attach(host)?;

        settings
            .define_setting(
                SettingDefinition::number(
                    NOTIFICATIONS_ENABLED_SETTING,
                    "Enables desktop notifications if set to 1",
                )
                .with_choices([SettingValue::Number(0.0), SettingValue::Number(1.0)])
                .with_value(1.0),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let weak = core.host_weak();
        settings
            .subscribe_setting(
                NOTIFICATIONS_ENABLED_SETTING,
                Box::new(move |update| {
                    let weak = weak.clone();
                    Box::pin(async move {
                        let Some(host) = weak.upgrade() else {
                            return;
                        };
                        let enabled = matches!(
                            &update,
                            SettingUpdate::Value(SettingValue::Number(n)) if *n != 0.0
                        );

                        if let Ok(log) = host.capability::<dyn LogApi>() {
                            log.log_output(if enabled {
                                "Desktop notifications enabled"
                            } else {
                                "Desktop notifications disabled"
                            })
                            .await;
                        }

                        if enabled {
                            host.emit(
                                hooks::NOTIFY_SUCCESS,
                                HookData::Notification(Notification::new(
                                    NotificationLevel::Success,
                                    "Notifications Enabled",
                                    "You will receive desktop notifications from now on",
                                )),
                            )
                            .await;
                        }

                        host.emit(
                            hooks::NOTIFY_ENABLED_CHANGED,
                            HookData::Setting {
                                key: NOTIFICATIONS_ENABLED_SETTING.to_string(),
                                value: Some(SettingValue::Number(if enabled { 1.0 } else { 0.0 })),
                            },
                        )
                        .await;
                    })
                }),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let plugin = Arc::new(Self { core, settings });
        host.provide::<dyn NotificationsApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn NotificationsApi>,
        )?;
        Ok(plugin)
    }

    async fn emit_notification(&self, hook: &'static str, notification: Notification) {
        if let Err(err) = self
            .core
            .emit(hook, HookData::Notification(notification))
            .await
        {
            error!(error = %err, "failed to propagate notification");
        }
    }
}

fn enabled(settings: &dyn SettingsApi) -> bool {
    settings
        .get_setting(NOTIFICATIONS_ENABLED_SETTING)
        .and_then(|v| v.as_number())
        .map(|n| n != 0.0)
        .unwrap_or(false)
}

fn delivery_handler(
    settings: Arc<dyn SettingsApi>,
    sink: Arc<dyn NotificationSink>,
) -> impl Fn(HookData) -> HookFuture + Send + Sync + 'static {
    move |data| {
        let settings = Arc::clone(&settings);
        let sink = Arc::clone(&sink);

        Box::pin(async move {
            let HookData::Notification(notification) = data else {
                return Ok(());
            };

            if !enabled(settings.as_ref()) {
                return Ok(());
            }

            let delivered = Notification {
                level: notification.level,
                title: format!("{}{}", notification.level.prefix(), notification.title),
                message: notification.message,
            };
            sink.deliver(&delivered)
        })
    }
}

impl Module for NotificationsPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl NotificationsApi for NotificationsPlugin {
    async fn notify(&self, title: &str, message: &str) {
        self.emit_notification(
            hooks::NOTIFY_GENERIC,
            Notification::new(NotificationLevel::Generic, title, message),
        )
        .await;
    }

    async fn notify_success(&self, title: &str, message: &str) {
        self.emit_notification(
            hooks::NOTIFY_SUCCESS,
            Notification::new(NotificationLevel::Success, title, message),
        )
        .await;
    }

    async fn notify_error(&self, title: &str, message: &str) {
        self.emit_notification(
            hooks::NOTIFY_ERROR,
            Notification::new(NotificationLevel::Error, title, message),
        )
        .await;
    }

    async fn notify_important(&self, title: &str, message: &str) {
        self.emit_notification(
            hooks::NOTIFY_IMPORTANT,
            Notification::new(NotificationLevel::Important, title, message),
        )
        .await;
    }

    fn notifications_enabled(&self) -> bool {
        enabled(self.settings.as_ref())
    }

    async fn set_notifications_enabled(&self, value: bool) -> Result<(), SettingsError> {
        if value == self.notifications_enabled() {
            return Ok(());
        }

        self.settings
            .set_setting(
                NOTIFICATIONS_ENABLED_SETTING,
                SettingValue::Number(if value { 1.0 } else { 0.0 }),
            )
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::core::settings::SettingsPlugin;
    use crate::util::lock;
    use std::sync::Mutex;

    struct RecordingSink {
        delivered: Mutex<Vec<Notification>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
            })
        }

        fn titles(&self) -> Vec<String> {
            lock(&self.delivered).iter().map(|n| n.title.clone()).collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
            lock(&self.delivered).push(notification.clone());
            Ok(())
        }
    }

    async fn notification_host() -> (Arc<ModuleHost>, Arc<RecordingSink>, Arc<NotificationsPlugin>) {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(SettingsPlugin::build).unwrap();

        let sink = RecordingSink::new();
        let sink_arc: Arc<dyn NotificationSink> = Arc::clone(&sink) as Arc<dyn NotificationSink>;
        let plugin = host
            .add_module(move |h| NotificationsPlugin::build(h, sink_arc))
            .unwrap();

        (host, sink, plugin)
    }

    #[tokio::test]
    async fn test_notifications_delivered_with_level_prefix() {
        let (_host, sink, plugin) = notification_host().await;

        plugin.notify_important("Trade Size Alert", "big trade").await;
        plugin.notify("Heads Up", "plain").await;

        assert_eq!(
            sink.titles(),
            vec!["Important: Trade Size Alert".to_string(), "Heads Up".to_string()]
        );
    }

    #[tokio::test]
    async fn test_disabled_notifications_suppressed() {
        let (_host, sink, plugin) = notification_host().await;

        plugin.set_notifications_enabled(false).await.unwrap();
        plugin.notify_error("Broken", "nope").await;

        assert!(sink.titles().is_empty());
        assert!(!plugin.notifications_enabled());
    }

    #[tokio::test]
    async fn test_reenabling_confirms_with_a_notification() {
        let (_host, sink, plugin) = notification_host().await;

        plugin.set_notifications_enabled(false).await.unwrap();
        plugin.set_notifications_enabled(true).await.unwrap();

        assert_eq!(sink.titles(), vec!["Success: Notifications Enabled".to_string()]);
    }

    #[tokio::test]
    async fn test_enabled_change_emits_hook() {
        let (host, _sink, plugin) = notification_host().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            use crate::host::module::ModuleBuilder;

            struct Probe {
                core: ModuleCore,
            }
            impl Module for Probe {
                fn core(&self) -> &ModuleCore {
                    &self.core
                }
            }

            let sink = Arc::clone(&seen);
            host.add_module(|h| {
                Ok(Arc::new(Probe {
                    core: ModuleBuilder::new("widget:status")
                        .on(hooks::NOTIFY_ENABLED_CHANGED, move |data| {
                            let sink = Arc::clone(&sink);
                            Box::pin(async move {
                                if let HookData::Setting { value, .. } = data {
                                    lock(&sink).push(value);
                                }
                                Ok(())
                            })
                        })
                        .attach(h)?,
                }))
            })
            .unwrap();
        }

        plugin.set_notifications_enabled(false).await.unwrap();
        assert_eq!(*lock(&seen), vec![Some(SettingValue::Number(0.0))]);
    }
}
