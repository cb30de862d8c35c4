//! Order book feed plugin
//!
//! Subscribes the managed order book for the host symbol and forwards each
//! update onto the bus.

use std::sync::Arc;

use anyhow::Context;

use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::spawn_emit;
use crate::plugins::ws::connection::ConnectionApi;

const BOOK_PRECISION: &str = "P0";
const BOOK_LENGTH: u32 = 25;

pub struct OrderBooksPlugin {
    core: ModuleCore,
}

impl OrderBooksPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let weak = Arc::downgrade(host);

        let core = Plugin::builder("data:order-books")
            .requires_module("plugin:ws:connection")
            .provides_hook(hooks::DATA_ORDER_BOOK)
            .on(hooks::WS_OPENED, move |_| {
                let weak = weak.clone();
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();
                    let symbol = host.symbol().to_string();

                    {
                        let weak = weak.clone();
                        let symbol = symbol.clone();
                        stream.on_order_book(
                            &symbol.clone(),
                            Box::new(move |book| {
                                spawn_emit(
                                    &weak,
                                    hooks::DATA_ORDER_BOOK,
                                    HookData::OrderBook {
                                        symbol: symbol.clone(),
                                        book,
                                    },
                                );
                            }),
                        );
                    }

                    stream
                        .subscribe_order_book(&symbol, BOOK_PRECISION, BOOK_LENGTH)
                        .await?;
                    Ok(())
                })
            })
            .attach(host)?;

        Ok(Arc::new(Self { core }))
    }
}

impl Module for OrderBooksPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::sim::SimStream;
    use crate::exchange::stream::MarketStream;
    use crate::exchange::types::{BookLevel, OrderBook};
    use crate::host::module::ModuleBuilder;
    use crate::plugins::core::logger::LoggerPlugin;
    use crate::plugins::core::utilities::UtilitiesPlugin;
    use crate::plugins::ws::connection::ConnectionPlugin;
    use crate::util::lock;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Probe {
        core: ModuleCore,
    }

    impl Module for Probe {
        fn core(&self) -> &ModuleCore {
            &self.core
        }
    }

    #[tokio::test]
    async fn test_book_subscription_and_forwarding() {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(LoggerPlugin::build).unwrap();
        host.add_module(UtilitiesPlugin::build).unwrap();

        let stream = Arc::new(SimStream::new());
        let s = Arc::clone(&stream) as Arc<dyn MarketStream>;
        host.add_module(move |h| ConnectionPlugin::build(h, s)).unwrap();
        host.add_module(OrderBooksPlugin::build).unwrap();

        let tops = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&tops);
        host.add_module(|h| {
            Ok(Arc::new(Probe {
                core: ModuleBuilder::new("widget:order-book")
                    .on(hooks::DATA_ORDER_BOOK, move |data| {
                        let sink = Arc::clone(&sink);
                        Box::pin(async move {
                            if let HookData::OrderBook { book, .. } = data {
                                lock(&sink).push(book.top_bid());
                            }
                            Ok(())
                        })
                    })
                    .attach(h)?,
            }))
        })
        .unwrap();

        host.boot().await.unwrap();
        assert!(stream
            .subscriptions()
            .contains(&"book:tBTCUSD:P0:25".to_string()));

        stream.feed_order_book(
            "tBTCUSD",
            OrderBook {
                bids: vec![BookLevel {
                    price: 39_999.0,
                    count: 3,
                    amount: 2.0,
                }],
                asks: vec![],
            },
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*lock(&tops), vec![Some(39_999.0)]);
    }
}
