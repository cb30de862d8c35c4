//! Setting registry lifecycle through the host capability surface

use std::sync::{Arc, Mutex};

use tradeterm::host::ModuleHost;
use tradeterm::plugins::core::settings::{SettingsApi, SettingsPlugin};
use tradeterm::settings::{SettingDefinition, SettingUpdate, SettingValue, SettingsError};

async fn settings_host() -> (Arc<ModuleHost>, Arc<dyn SettingsApi>) {
    let host = ModuleHost::new("tBTCUSD");
    host.add_module(SettingsPlugin::build).unwrap();
    let settings = host.capability::<dyn SettingsApi>().unwrap();
    (host, settings)
}

fn positive_number(key: &str) -> SettingDefinition {
    SettingDefinition::number(key, "positive test value")
        .with_validate(|v| matches!(v, SettingValue::Number(n) if *n > 0.0))
}

#[tokio::test]
async fn test_lifecycle_round_trip() {
    let (_host, settings) = settings_host().await;
    settings.define_setting(positive_number("ns.x")).unwrap();

    settings
        .set_setting("ns.x", SettingValue::text("5"))
        .await
        .unwrap();
    assert_eq!(settings.get_setting("ns.x"), Some(SettingValue::Number(5.0)));

    assert!(settings
        .set_setting("ns.x", SettingValue::text("-1"))
        .await
        .is_err());
    assert_eq!(settings.get_setting("ns.x"), Some(SettingValue::Number(5.0)));

    assert!(settings
        .set_setting("ns.x", SettingValue::text("abc"))
        .await
        .is_err());
    assert_eq!(settings.get_setting("ns.x"), Some(SettingValue::Number(5.0)));
}

#[tokio::test]
async fn test_duplicate_definition_rejected() {
    let (_host, settings) = settings_host().await;

    settings.define_setting(positive_number("ns.x")).unwrap();
    assert!(matches!(
        settings.define_setting(positive_number("ns.x")),
        Err(SettingsError::AlreadyDefined(_))
    ));
}

#[tokio::test]
async fn test_choices_checked_after_validation() {
    let (_host, settings) = settings_host().await;

    settings
        .define_setting(
            SettingDefinition::number("ns.flag", "a binary flag")
                .with_validate(|v| matches!(v, SettingValue::Number(n) if n.is_finite()))
                .with_choices([SettingValue::Number(0.0), SettingValue::Number(1.0)]),
        )
        .unwrap();

    settings
        .set_setting("ns.flag", SettingValue::Number(1.0))
        .await
        .unwrap();

    // 2 passes validation but fails the choice allow-list
    assert!(matches!(
        settings.set_setting("ns.flag", SettingValue::Number(2.0)).await,
        Err(SettingsError::InvalidChoice { .. })
    ));
}

#[tokio::test]
async fn test_subscriber_order_and_removal_sentinel() {
    let (_host, settings) = settings_host().await;
    settings.define_setting(positive_number("ns.x")).unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b"] {
        let calls = Arc::clone(&calls);
        settings
            .subscribe_setting(
                "ns.x",
                Box::new(move |update| {
                    let calls = Arc::clone(&calls);
                    Box::pin(async move {
                        calls.lock().unwrap().push((name, update));
                    })
                }),
            )
            .unwrap();
    }

    settings
        .set_setting("ns.x", SettingValue::Number(2.0))
        .await
        .unwrap();
    settings.remove_setting("ns.x").await.unwrap();

    let seen = calls.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("a", SettingUpdate::Value(SettingValue::Number(2.0))),
            ("b", SettingUpdate::Value(SettingValue::Number(2.0))),
            ("a", SettingUpdate::Removed),
            ("b", SettingUpdate::Removed),
        ]
    );

    // the key is unknown once subscribers were notified
    assert_eq!(settings.get_setting("ns.x"), None);
    assert!(matches!(
        settings.set_setting("ns.x", SettingValue::Number(1.0)).await,
        Err(SettingsError::UnknownKey(_))
    ));
}

#[tokio::test]
async fn test_validate_preflight_does_not_commit() {
    let (_host, settings) = settings_host().await;
    settings.define_setting(positive_number("ns.x")).unwrap();

    assert!(settings
        .validate_setting("ns.x", &SettingValue::text("3"))
        .unwrap()
        .is_none());
    assert!(settings
        .validate_setting("ns.x", &SettingValue::text("-3"))
        .unwrap()
        .is_some());
    assert!(settings
        .validate_setting("ns.missing", &SettingValue::text("3"))
        .is_err());

    assert_eq!(settings.get_setting("ns.x"), None);
}

#[tokio::test]
async fn test_unsubscribe_stops_notifications() {
    let (_host, settings) = settings_host().await;
    settings.define_setting(positive_number("ns.x")).unwrap();

    let count = Arc::new(Mutex::new(0usize));
    let c = Arc::clone(&count);
    let subscription = settings
        .subscribe_setting(
            "ns.x",
            Box::new(move |_| {
                let c = Arc::clone(&c);
                Box::pin(async move {
                    *c.lock().unwrap() += 1;
                })
            }),
        )
        .unwrap();

    settings
        .set_setting("ns.x", SettingValue::Number(1.0))
        .await
        .unwrap();
    settings.unsubscribe_setting("ns.x", subscription).unwrap();
    settings
        .set_setting("ns.x", SettingValue::Number(2.0))
        .await
        .unwrap();

    assert_eq!(*count.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_clear_settings_removes_everything() {
    let (_host, settings) = settings_host().await;
    settings.define_setting(positive_number("a.x")).unwrap();
    settings.define_setting(positive_number("b.y")).unwrap();

    settings.clear_settings().await;
    assert!(settings.list_settings(None).is_empty());
}
