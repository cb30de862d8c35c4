//! Account order plugin
//!
//! Forwards order lifecycle events from the stream, keeps the session order
//! history, and owns order submission and batch cancelation. The default
//! order size for quick commands is held in the `orders.quick-size` setting.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::exchange::types::{Order, OrderRequest, OrderStatus};
use crate::format::format_amount;
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::plugins::core::logger::LogApi;
use crate::plugins::core::notifications::NotificationsApi;
use crate::plugins::core::settings::SettingsApi;
use crate::plugins::spawn_emit;
use crate::plugins::ws::connection::ConnectionApi;
use crate::settings::{SettingDefinition, SettingValue};
use crate::util::{gen_client_id, lock};

pub const QUICK_SIZE_SETTING: &str = "orders.quick-size";

/// Order submission and history capability.
#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Submit an order: assigns client/group IDs, records it in the session
    /// history and pushes it to the exchange.
    async fn submit_order(&self, request: OrderRequest) -> anyhow::Result<Order>;

    /// Cancel orders by their session history IDs via the batch cancel
    /// primitive; every ID must reference a known, active order.
    async fn cancel_orders_by_id(&self, ids: &[usize]) -> anyhow::Result<Vec<u64>>;

    /// Session history IDs of orders still active.
    fn active_order_ids(&self) -> Vec<usize>;

    fn order_history(&self) -> Vec<Order>;

    /// Default size for quick order commands; 0 when unset.
    fn quick_order_size(&self) -> f64;
}

struct OrdersState {
    history: Mutex<Vec<Order>>,
    gid: Uuid,
}

impl OrdersState {
    /// Update a history entry matching the incoming order by client or
    /// exchange ID; unknown orders (placed outside this session) are
    /// appended.
    fn absorb(&self, order: Order) {
        let mut history = lock(&self.history);

        let slot = history.iter_mut().find(|existing| {
            (order.cid != 0 && existing.cid == order.cid)
                || (order.id.is_some() && existing.id == order.id)
        });

        match slot {
            Some(existing) => *existing = order,
            None => history.push(order),
        }
    }
}

pub struct OrdersPlugin {
    core: ModuleCore,
    state: Arc<OrdersState>,
    settings: Arc<dyn SettingsApi>,
}

impl OrdersPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let settings = host.capability::<dyn SettingsApi>()?;

        let state = Arc::new(OrdersState {
            history: Mutex::new(Vec::new()),
            gid: Uuid::new_v4(),
        });

        let weak = Arc::downgrade(host);
        let handler_state = Arc::clone(&state);

        let core = Plugin::builder("data:orders")
            .requires_module("plugin:ws:connection")
            .requires_module("plugin:core:settings")
            .requires_module("plugin:core:notifications")
            .requires_module("plugin:core:logger")
            .provides_hook(hooks::DATA_ORDER_SNAPSHOT)
            .provides_hook(hooks::DATA_ORDER_CREATED)
            .provides_hook(hooks::DATA_ORDER_UPDATED)
            .provides_hook(hooks::DATA_ORDER_CLOSED)
            .host_methods(&["active_order_ids", "order_history", "quick_order_size"])
            .async_host_methods(&["submit_order", "cancel_orders_by_id"])
            .on(hooks::WS_AUTHENTICATED, move |_| {
                let weak = weak.clone();
                let state = Arc::clone(&handler_state);
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();

                    {
                        let weak = weak.clone();
                        let state = Arc::clone(&state);
                        stream.on_order_snapshot(Box::new(move |orders| {
                            for order in &orders {
                                state.absorb(order.clone());
                            }
                            spawn_emit(
                                &weak,
                                hooks::DATA_ORDER_SNAPSHOT,
                                HookData::Orders(orders),
                            );
                        }));
                    }

                    let forward = |hook: &'static str| -> crate::exchange::stream::OrderCallback {
                        let weak = weak.clone();
                        let state = Arc::clone(&state);
                        Box::new(move |order: Order| {
                            state.absorb(order.clone());
                            spawn_emit(&weak, hook, HookData::Order(order));
                        })
                    };

                    stream.on_order_new(forward(hooks::DATA_ORDER_CREATED));
                    stream.on_order_update(forward(hooks::DATA_ORDER_UPDATED));
                    stream.on_order_close(forward(hooks::DATA_ORDER_CLOSED));

                    Ok(())
                })
            })
            .attach(host)?;

        settings
            .define_setting(
                SettingDefinition::number(
                    QUICK_SIZE_SETTING,
                    "Quick order size, used as default in order commands",
                )
                .with_validate(|v| matches!(v, SettingValue::Number(n) if n.is_finite()))
                .with_value(0.0),
            )
            .map_err(|e| ModuleAddError::Init(anyhow::Error::new(e)))?;

        let plugin = Arc::new(Self {
            core,
            state,
            settings,
        });
        host.provide::<dyn OrdersApi>(plugin.id(), Arc::clone(&plugin) as Arc<dyn OrdersApi>)?;
        Ok(plugin)
    }
}

fn describe_order(order: &Order) -> String {
    format!(
        "{} {} {} @ {}",
        match order.order_type {
            crate::exchange::types::OrderType::Market => "MARKET",
            crate::exchange::types::OrderType::Limit => "LIMIT",
        },
        format_amount(order.amount),
        order.symbol,
        order
            .price
            .map(|p| format_amount(p))
            .unwrap_or_else(|| "market".to_string()),
    )
}

impl Module for OrdersPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

#[async_trait]
impl OrdersApi for OrdersPlugin {
    async fn submit_order(&self, request: OrderRequest) -> anyhow::Result<Order> {
        let host = self.core.host()?;
        let stream = host.capability::<dyn ConnectionApi>()?.stream();
        let log = host.capability::<dyn LogApi>()?;
        let notifications = host.capability::<dyn NotificationsApi>()?;

        let order = Order {
            id: None,
            cid: gen_client_id(),
            gid: Some(self.state.gid),
            symbol: request.symbol,
            order_type: request.order_type,
            amount: request.amount,
            amount_orig: request.amount,
            price: request.price,
            price_avg: 0.0,
            status: OrderStatus::Pending,
            mts_create: Utc::now(),
        };

        lock(&self.state.history).push(order.clone());

        log.log_star(&format!("submitting order: {}", describe_order(&order)))
            .await;
        stream.submit_order(&order).await?;

        notifications
            .notify_success("Order Submitted", &describe_order(&order))
            .await;
        Ok(order)
    }

    async fn cancel_orders_by_id(&self, ids: &[usize]) -> anyhow::Result<Vec<u64>> {
        let host = self.core.host()?;
        let stream = host.capability::<dyn ConnectionApi>()?.stream();
        let notifications = host.capability::<dyn NotificationsApi>()?;

        let exchange_ids = {
            let history = lock(&self.state.history);
            let mut exchange_ids = Vec::with_capacity(ids.len());

            for id in ids {
                let Some(order) = history.get(*id) else {
                    bail!("unknown order, cannot cancel: {id}");
                };

                if !order.is_active() {
                    bail!("order inactive, cannot cancel: {id}");
                }

                let Some(exchange_id) = order.id else {
                    bail!("order lacking exchange ID, cannot cancel: {id}");
                };

                exchange_ids.push(exchange_id);
            }

            exchange_ids
        };

        let payload = serde_json::json!([0, "oc_multi", null, { "id": exchange_ids }]);

        if let Err(e) = stream.send_raw(payload).await {
            // socket may have closed under us
            notifications
                .notify_error("Failed to Cancel Orders", &e.to_string())
                .await;
            return Err(e.into());
        }

        notifications
            .notify_important(
                "Canceled Orders",
                &format!("{} orders requested for cancelation", exchange_ids.len()),
            )
            .await;
        Ok(exchange_ids)
    }

    fn active_order_ids(&self) -> Vec<usize> {
        lock(&self.state.history)
            .iter()
            .enumerate()
            .filter(|(_, order)| order.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    fn order_history(&self) -> Vec<Order> {
        lock(&self.state.history).clone()
    }

    fn quick_order_size(&self) -> f64 {
        self.settings
            .get_setting(QUICK_SIZE_SETTING)
            .and_then(|v| v.as_number())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::sim::SimStream;
    use crate::exchange::stream::MarketStream;
    use crate::plugins::core::logger::LoggerPlugin;
    use crate::plugins::core::notifications::{NotificationsPlugin, TracingSink};
    use crate::plugins::core::settings::SettingsPlugin;
    use crate::plugins::core::utilities::UtilitiesPlugin;
    use crate::plugins::ws::connection::ConnectionPlugin;

    async fn orders_host() -> (Arc<ModuleHost>, Arc<SimStream>, Arc<OrdersPlugin>) {
        let host = ModuleHost::new("tBTCUSD");
        host.add_module(LoggerPlugin::build).unwrap();
        host.add_module(UtilitiesPlugin::build).unwrap();
        host.add_module(SettingsPlugin::build).unwrap();
        host.add_module(|h| NotificationsPlugin::build(h, Arc::new(TracingSink)))
            .unwrap();

        let stream = Arc::new(SimStream::new());
        let s = Arc::clone(&stream) as Arc<dyn MarketStream>;
        host.add_module(move |h| ConnectionPlugin::build(h, s)).unwrap();
        let orders = host.add_module(OrdersPlugin::build).unwrap();

        host.boot().await.unwrap();
        (host, stream, orders)
    }

    #[tokio::test]
    async fn test_submission_assigns_ids_and_records_history() {
        let (_host, stream, orders) = orders_host().await;

        let order = orders
            .submit_order(OrderRequest::market("tBTCUSD", 0.5))
            .await
            .unwrap();

        assert!(order.cid > 0);
        assert!(order.gid.is_some());
        assert_eq!(stream.submitted_orders().len(), 1);
        assert_eq!(stream.submitted_orders()[0].cid, order.cid);

        // the sim confirms via an order-new event carrying the exchange ID
        let history = orders.order_history();
        assert_eq!(history.len(), 1);
        assert!(history[0].id.is_some());
        assert_eq!(orders.active_order_ids(), vec![0]);
    }

    #[tokio::test]
    async fn test_lifecycle_updates_reflected_in_history() {
        let (_host, stream, orders) = orders_host().await;

        let order = orders
            .submit_order(OrderRequest::limit("tBTCUSD", 1.0, 40_000.0))
            .await
            .unwrap();

        let mut closed = orders.order_history()[0].clone();
        closed.status = OrderStatus::Executed;
        closed.amount = 0.0;
        closed.price_avg = 40_001.0;
        stream.feed_order_close(closed);

        let history = orders.order_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::Executed);
        assert_eq!(history[0].cid, order.cid);
        assert!(orders.active_order_ids().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_validates_ids() {
        let (_host, stream, orders) = orders_host().await;

        let err = orders.cancel_orders_by_id(&[3]).await.unwrap_err();
        assert!(err.to_string().contains("unknown order"));

        orders
            .submit_order(OrderRequest::limit("tBTCUSD", 1.0, 40_000.0))
            .await
            .unwrap();

        let canceled = orders.cancel_orders_by_id(&[0]).await.unwrap();
        assert_eq!(canceled.len(), 1);

        let sends = stream.raw_sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0][1], "oc_multi");

        // an executed order can no longer be canceled
        let mut closed = orders.order_history()[0].clone();
        closed.status = OrderStatus::Canceled;
        stream.feed_order_close(closed);

        let err = orders.cancel_orders_by_id(&[0]).await.unwrap_err();
        assert!(err.to_string().contains("inactive"));
    }

    #[tokio::test]
    async fn test_quick_size_follows_setting() {
        let (host, _stream, orders) = orders_host().await;
        assert_eq!(orders.quick_order_size(), 0.0);

        let settings = host.capability::<dyn SettingsApi>().unwrap();
        settings
            .set_setting(QUICK_SIZE_SETTING, SettingValue::text("0.25"))
            .await
            .unwrap();
        assert_eq!(orders.quick_order_size(), 0.25);
    }
}
