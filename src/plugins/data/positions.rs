//! Position feed plugin
//!
//! Forwards account position events and tracks the live position for the
//! host symbol.

use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::exchange::types::{Position, PositionStatus};
use crate::host::error::ModuleAddError;
use crate::host::hooks::{self, HookData};
use crate::host::module::{Module, ModuleCore, Plugin};
use crate::host::module_host::ModuleHost;
use crate::exchange::stream::PositionCallback;
use crate::plugins::spawn_emit;
use crate::plugins::ws::connection::ConnectionApi;
use crate::util::lock;

/// Read access to the live position for the host symbol.
pub trait PositionsApi: Send + Sync {
    fn position(&self) -> Option<Position>;
}

type PositionStore = Arc<Mutex<Option<Position>>>;

pub struct PositionsPlugin {
    core: ModuleCore,
    store: PositionStore,
}

impl PositionsPlugin {
    pub fn build(host: &Arc<ModuleHost>) -> Result<Arc<Self>, ModuleAddError> {
        let store: PositionStore = Arc::new(Mutex::new(None));
        let weak = Arc::downgrade(host);
        let handler_store = Arc::clone(&store);

        let core = Plugin::builder("data:positions")
            .requires_module("plugin:ws:connection")
            .provides_hook(hooks::DATA_POSITION_SNAPSHOT)
            .provides_hook(hooks::DATA_POSITION_CREATED)
            .provides_hook(hooks::DATA_POSITION_UPDATED)
            .provides_hook(hooks::DATA_POSITION_CLOSED)
            .host_methods(&["position"])
            .on(hooks::WS_AUTHENTICATED, move |_| {
                let weak = weak.clone();
                let store = Arc::clone(&handler_store);
                Box::pin(async move {
                    let host = weak.upgrade().context("module host dropped")?;
                    let stream = host.capability::<dyn ConnectionApi>()?.stream();
                    let symbol = host.symbol().to_string();

                    {
                        let weak = weak.clone();
                        let store = Arc::clone(&store);
                        let symbol = symbol.clone();
                        stream.on_position_snapshot(Box::new(move |positions| {
                            if let Some(own) = positions.iter().find(|p| p.symbol == symbol) {
                                *lock(&store) = Some(own.clone());
                            }
                            spawn_emit(
                                &weak,
                                hooks::DATA_POSITION_SNAPSHOT,
                                HookData::Positions(positions),
                            );
                        }));
                    }

                    let track = |hook: &'static str| -> PositionCallback {
                        let weak = weak.clone();
                        let store = Arc::clone(&store);
                        let symbol = symbol.clone();
                        Box::new(move |position: Position| {
                            if position.symbol == symbol {
                                *lock(&store) = Some(position.clone());
                            }
                            spawn_emit(&weak, hook, HookData::Position(position));
                        })
                    };

                    stream.on_position_new(track(hooks::DATA_POSITION_CREATED));
                    stream.on_position_update(track(hooks::DATA_POSITION_UPDATED));

                    {
                        let weak = weak.clone();
                        let store = Arc::clone(&store);
                        let symbol = symbol.clone();
                        stream.on_position_close(Box::new(move |mut position| {
                            if position.symbol == symbol {
                                *lock(&store) = None;
                            }
                            position.status = PositionStatus::Closed;
                            spawn_emit(
                                &weak,
                                hooks::DATA_POSITION_CLOSED,
                                HookData::Position(position),
                            );
                        }));
                    }

                    Ok(())
                })
            })
            .attach(host)?;

        let plugin = Arc::new(Self { core, store });
        host.provide::<dyn PositionsApi>(
            plugin.id(),
            Arc::clone(&plugin) as Arc<dyn PositionsApi>,
        )?;
        Ok(plugin)
    }
}

impl Module for PositionsPlugin {
    fn core(&self) -> &ModuleCore {
        &self.core
    }
}

impl PositionsApi for PositionsPlugin {
    fn position(&self) -> Option<Position> {
        lock(&self.store).clone()
    }
}
