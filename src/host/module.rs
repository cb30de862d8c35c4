//! Module base: builder, core state and the `Module` trait
//!
//! A module declares its identity, dependencies (other modules by ID, hooks
//! by name), the hooks it provides, the host methods it exposes through a
//! capability, and its hook handlers. `ModuleBuilder::attach` validates the
//! whole declaration at once and wires the handlers onto the host bus.

use std::sync::{Arc, Weak};

use anyhow::{bail, Context};
use futures_util::future::BoxFuture;

use crate::host::error::{ModuleAddError, ValidationError, ValidationErrors};
use crate::host::hooks::HookData;
use crate::host::id::ModuleId;
use crate::host::module_host::ModuleHost;

pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type HookHandler = Arc<dyn Fn(HookData) -> HookFuture + Send + Sync>;

/// Whether a host method blocks on the runtime or returns immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Sync,
    Async,
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// Declarative metadata held by every module instance.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub id: ModuleId,
    pub unique: bool,
    pub required_modules: Vec<ModuleId>,
    pub provided_hooks: Vec<&'static str>,
    pub required_hooks: Vec<&'static str>,
    pub host_methods: Vec<&'static str>,
    pub async_host_methods: Vec<&'static str>,
}

/// Builder for a module declaration; consumed by `attach`.
pub struct ModuleBuilder {
    id: String,
    unique: bool,
    required_modules: Vec<String>,
    provided_hooks: Vec<&'static str>,
    required_hooks: Vec<&'static str>,
    host_methods: Vec<&'static str>,
    async_host_methods: Vec<&'static str>,
    hooks: Vec<(&'static str, HookHandler)>,
}

impl ModuleBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unique: false,
            required_modules: Vec::new(),
            provided_hooks: Vec::new(),
            required_hooks: Vec::new(),
            host_methods: Vec::new(),
            async_host_methods: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Allow several instances of this identity on one host.
    pub fn non_unique(mut self) -> Self {
        self.unique = false;
        self
    }

    pub fn requires_module(mut self, id: &str) -> Self {
        self.required_modules.push(id.to_string());
        self
    }

    pub fn provides_hook(mut self, hook: &'static str) -> Self {
        self.provided_hooks.push(hook);
        self
    }

    /// Declare a hook dependency without consuming it; hooks handled via
    /// `on` are required implicitly.
    pub fn requires_hook(mut self, hook: &'static str) -> Self {
        self.required_hooks.push(hook);
        self
    }

    pub fn host_methods(mut self, names: &[&'static str]) -> Self {
        self.host_methods.extend_from_slice(names);
        self
    }

    pub fn async_host_methods(mut self, names: &[&'static str]) -> Self {
        self.async_host_methods.extend_from_slice(names);
        self
    }

    /// Register a handler for a hook. Handlers run in module registration
    /// order; a returned error is isolated at the dispatch boundary and
    /// rerouted to `host:error`.
    pub fn on<F>(mut self, hook: &'static str, handler: F) -> Self
    where
        F: Fn(HookData) -> HookFuture + Send + Sync + 'static,
    {
        self.hooks.push((hook, Arc::new(handler)));
        self
    }

    /// Validate the declaration and wire it onto the host.
    ///
    /// All construction-time validation failures are reported together in a
    /// single `ValidationErrors`. Host mutation (method claims, listener
    /// registration) happens only after every check passed.
    pub fn attach(self, host: &Arc<ModuleHost>) -> Result<ModuleCore, ModuleAddError> {
        host.ensure_assembling()?;

        let mut errors = Vec::new();

        let id = match ModuleId::parse(&self.id) {
            Ok(id) => Some(id),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let mut required_modules = Vec::new();
        for raw in &self.required_modules {
            match ModuleId::parse(raw) {
                Ok(id) => required_modules.push(id),
                Err(e) => errors.push(ValidationError::new(
                    format!("required module ID invalid: {}", e.message),
                    raw.clone(),
                )),
            }
        }

        if !(self.host_methods.is_empty() && self.async_host_methods.is_empty()) && !self.unique {
            errors.push(ValidationError::new(
                "module provides host methods but is not flagged unique",
                self.id.clone(),
            ));
        }

        let id = match id {
            Some(id) if errors.is_empty() => id,
            _ => return Err(ValidationErrors::new(self.id, errors).into()),
        };

        if self.unique && host.has_module(&id) {
            return Err(ModuleAddError::DuplicateUnique(id));
        }

        let mut required_hooks = Vec::new();
        for hook in self
            .required_hooks
            .iter()
            .chain(self.hooks.iter().map(|(name, _)| name))
        {
            if !required_hooks.contains(hook) {
                required_hooks.push(*hook);
            }
        }

        let record = ModuleRecord {
            id: id.clone(),
            unique: self.unique,
            required_modules,
            provided_hooks: self.provided_hooks,
            required_hooks,
            host_methods: self.host_methods,
            async_host_methods: self.async_host_methods,
        };

        host.claim_methods(&record)?;

        for (hook, handler) in self.hooks {
            host.add_listener(hook, id.clone(), handler);
        }

        Ok(ModuleCore {
            record,
            host: Arc::downgrade(host),
        })
    }
}

/// Per-instance state every module holds: its record plus a weak handle to
/// the host it is attached to.
#[derive(Debug)]
pub struct ModuleCore {
    record: ModuleRecord,
    host: Weak<ModuleHost>,
}

impl ModuleCore {
    pub fn id(&self) -> &ModuleId {
        &self.record.id
    }

    pub fn record(&self) -> &ModuleRecord {
        &self.record
    }

    pub fn host(&self) -> anyhow::Result<Arc<ModuleHost>> {
        self.host.upgrade().context("module host dropped")
    }

    pub(crate) fn host_weak(&self) -> Weak<ModuleHost> {
        Weak::clone(&self.host)
    }

    /// Emit a hook on the host bus, awaiting every listener.
    ///
    /// Listener failures never propagate back here; the only errors are a
    /// dropped host or a `Json` payload that is not an object (the payload
    /// contract shared by the whole system).
    pub async fn emit(&self, hook: &'static str, data: HookData) -> anyhow::Result<()> {
        if let HookData::Json(value) = &data {
            if !value.is_object() {
                bail!("hook payload must be a JSON object if present [{hook}]");
            }
        }

        self.host()?.emit(hook, data).await;
        Ok(())
    }

    /// Fire-and-forget emit for synchronous call sites (stream callbacks,
    /// render paths). Failures are rerouted to the fallback error hook
    /// instead of surfacing, since the caller cannot observe them.
    pub fn emit_sync(&self, hook: &'static str, data: HookData) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let module = self.record.id.clone();

        tokio::spawn(async move {
            if let HookData::Json(value) = &data {
                if !value.is_object() {
                    let event = crate::host::error::ErrorEvent::Module {
                        module,
                        message: format!("hook payload must be a JSON object if present [{hook}]"),
                    };
                    host.emit(crate::host::hooks::HOST_ERROR, HookData::Error(event))
                        .await;
                    return;
                }
            }

            host.emit(hook, data).await;
        });
    }
}

/// Base trait for everything registered on a host.
pub trait Module: Send + Sync {
    fn core(&self) -> &ModuleCore;

    fn id(&self) -> &ModuleId {
        self.core().id()
    }

    fn is_unique(&self) -> bool {
        self.core().record().unique
    }

    fn required_modules(&self) -> &[ModuleId] {
        &self.core().record().required_modules
    }

    fn required_hooks(&self) -> &[&'static str] {
        &self.core().record().required_hooks
    }

    fn provided_hooks(&self) -> &[&'static str] {
        &self.core().record().provided_hooks
    }
}

/// Plugin convention: IDs live under `plugin:` and default to unique, since
/// plugins provide host-level cross-cutting capabilities.
pub struct Plugin;

impl Plugin {
    pub fn builder(id: &str) -> ModuleBuilder {
        ModuleBuilder::new(format!("plugin:{id}")).unique()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::module_host::ModuleHost;

    struct TestModule {
        core: ModuleCore,
    }

    impl Module for TestModule {
        fn core(&self) -> &ModuleCore {
            &self.core
        }
    }

    fn host() -> Arc<ModuleHost> {
        ModuleHost::new("tBTCUSD")
    }

    #[test]
    fn test_invalid_id_and_unique_flag_reported_together() {
        let host = host();
        let err = ModuleBuilder::new("no-separator")
            .host_methods(&["do_thing"])
            .attach(&host)
            .unwrap_err();

        let ModuleAddError::Validation(errors) = err else {
            panic!("expected aggregated validation errors, got {err}");
        };
        assert_eq!(errors.errors.len(), 2);
    }

    #[test]
    fn test_invalid_required_module_id_rejected() {
        let host = host();
        let err = ModuleBuilder::new("plugin:test:thing")
            .requires_module("bad id")
            .attach(&host)
            .unwrap_err();

        assert!(matches!(err, ModuleAddError::Validation(_)));
    }

    #[test]
    fn test_required_hooks_deduplicate_explicit_and_handled() {
        let host = host();
        let core = ModuleBuilder::new("plugin:test:thing")
            .requires_hook("a:hook")
            .requires_hook("b:hook")
            .on("a:hook", |_| Box::pin(async { Ok(()) }))
            .on("c:hook", |_| Box::pin(async { Ok(()) }))
            .attach(&host)
            .unwrap();

        assert_eq!(
            core.record().required_hooks,
            vec!["a:hook", "b:hook", "c:hook"]
        );
    }

    #[test]
    fn test_plugin_builder_namespaces_and_defaults_unique() {
        let host = host();
        let core = Plugin::builder("core:test").attach(&host).unwrap();

        assert_eq!(core.id().as_str(), "plugin:core:test");
        assert!(core.record().unique);
    }

    #[tokio::test]
    async fn test_emit_rejects_non_object_json_payload() {
        let host = host();
        let module = TestModule {
            core: ModuleBuilder::new("plugin:test:emitter")
                .attach(&host)
                .unwrap(),
        };

        let err = module
            .core()
            .emit("some:hook", HookData::Json(serde_json::json!(42)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("JSON object"), "got: {err}");

        module
            .core()
            .emit("some:hook", HookData::Json(serde_json::json!({"k": 1})))
            .await
            .unwrap();
    }
}
