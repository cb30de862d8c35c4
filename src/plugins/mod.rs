//! Feature modules registered on the host
//!
//! Grouped by concern: `core` (logging, utilities, settings,
//! notifications), `ws` (exchange stream lifecycle), `data` (feed → hook
//! propagation), `meta` (derived data, prime rules) and `alerts`.

pub mod alerts;
pub mod core;
pub mod data;
pub mod meta;
pub mod ws;

use std::sync::Weak;

use crate::host::hooks::HookData;
use crate::host::module_host::ModuleHost;

/// Forward an event from a synchronous stream callback onto the host bus.
///
/// Callbacks run outside any async context, so the emit is spawned; a host
/// that has already been dropped is silently ignored.
pub(crate) fn spawn_emit(host: &Weak<ModuleHost>, hook: &'static str, data: HookData) {
    if let Some(host) = host.upgrade() {
        tokio::spawn(async move {
            host.emit(hook, data).await;
        });
    }
}
