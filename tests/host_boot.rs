//! Full-assembly boot protocol tests against the simulated exchange

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tradeterm::app::{build_host, HostDeps};
use tradeterm::config::AppConfig;
use tradeterm::exchange::sim::{SimRest, SimStream};
use tradeterm::exchange::MarketStream;
use tradeterm::exchange::types::PublicTrade;
use tradeterm::host::hooks;
use tradeterm::host::{HostState, ModuleHost, Notification};
use tradeterm::plugins::core::logger::LoggerPlugin;
use tradeterm::plugins::core::notifications::NotificationSink;
use tradeterm::plugins::data::TIME_FRAMES;

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
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn config() -> AppConfig {
    AppConfig {
        symbol: "tBTCUSD".to_string(),
        api_key: None,
        api_secret: None,
    }
}

async fn boot_full_host() -> (Arc<ModuleHost>, Arc<SimStream>, Arc<RecordingSink>) {
    let stream = Arc::new(SimStream::new());
    let sink = RecordingSink::new();

    let host = build_host(
        &config(),
        HostDeps {
            stream: Arc::clone(&stream) as _,
            rest: Arc::new(SimRest::new("tBTCUSD")),
            sink: Arc::clone(&sink) as _,
        },
    )
    .unwrap();

    host.boot().await.unwrap();
    (host, stream, sink)
}

#[tokio::test]
async fn test_boot_transitions_to_running_and_opens_stream() {
    let (host, stream, _sink) = boot_full_host().await;

    assert_eq!(host.state(), HostState::Running);
    assert!(stream.is_open());
}

#[tokio::test]
async fn test_boot_subscribes_all_channels() {
    let (_host, stream, _sink) = boot_full_host().await;
    let subscriptions = stream.subscriptions();

    assert!(subscriptions.contains(&"trades:tBTCUSD".to_string()));
    assert!(subscriptions.contains(&"book:tBTCUSD:P0:25".to_string()));

    for tf in TIME_FRAMES {
        let key = format!("candles:trade:{tf}:tBTCUSD");
        assert!(subscriptions.contains(&key), "missing subscription: {key}");
    }
}

#[tokio::test]
async fn test_registered_module_set_and_projections() {
    let (host, _stream, _sink) = boot_full_host().await;

    let ids: Vec<String> = host
        .module_ids()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();

    for expected in [
        "plugin:core:logger",
        "plugin:core:utilities",
        "plugin:core:settings",
        "plugin:core:notifications",
        "plugin:ws:connection",
        "plugin:data:trades",
        "plugin:data:orders",
        "plugin:meta:primes",
        "plugin:alerts:trade-size",
        "command:orders:buy",
        "command:meta:list-executable",
    ] {
        assert!(ids.contains(&expected.to_string()), "missing: {expected}");
    }

    let all_hooks = host.all_provided_hooks();
    assert!(all_hooks.contains(&hooks::HOST_BOOT_STARTED));
    assert!(all_hooks.contains(&hooks::DATA_TRADE));
    assert!(all_hooks.contains(&hooks::NOTIFY_IMPORTANT));

    let methods = host.host_methods().unwrap();
    assert_eq!(
        methods["set_setting"].module.as_str(),
        "plugin:core:settings"
    );
    assert_eq!(methods["log_output"].module.as_str(), "plugin:core:logger");

    assert_eq!(host.commands().len(), 11);
}

#[tokio::test]
async fn test_add_module_after_boot_rejected() {
    let (host, _stream, _sink) = boot_full_host().await;

    let err = host.add_module(LoggerPlugin::build).unwrap_err();
    assert!(err.to_string().contains("already booted"), "got: {err}");
}

#[tokio::test]
async fn test_trade_size_alert_end_to_end() {
    let (_host, stream, sink) = boot_full_host().await;

    // market info seeded the threshold at min_trade_size * 1000 = 2.0;
    // a 3.0 buy should alert, a 1.0 buy should not
    stream.feed_public_trade(
        "tBTCUSD",
        PublicTrade {
            id: 1,
            mts: chrono::Utc::now(),
            amount: 1.0,
            price: 40_000.0,
        },
    );
    stream.feed_public_trade(
        "tBTCUSD",
        PublicTrade {
            id: 2,
            mts: chrono::Utc::now(),
            amount: 3.0,
            price: 40_000.0,
        },
    );

    tokio::time::sleep(Duration::from_millis(50)).await;

    let titles = sink.titles();
    assert_eq!(
        titles
            .iter()
            .filter(|t| t.contains("Trade Size Alert"))
            .count(),
        1,
        "got: {titles:?}"
    );
}

#[tokio::test]
async fn test_self_test_never_reaches_the_sink() {
    let (_host, _stream, sink) = boot_full_host().await;

    // boot ran the error-handler self-test; it must not surface anywhere
    // a human would see it
    assert!(sink
        .titles()
        .iter()
        .all(|t| !t.to_lowercase().contains("self-test")));
}
