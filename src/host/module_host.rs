//! Module host: composition root, event bus and boot sequencer
//!
//! Modules are added while the host is assembling; dependency checks are
//! deliberately deferred to `boot()` so registration order never matters.
//! Boot validates the aggregate graph, self-tests the fallback error path,
//! then emits the boot-start hook every feature module uses to begin active
//! work. After boot the module set is immutable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::commands::Command;
use crate::host::capability::CapabilityRegistry;
use crate::host::error::{BootError, ErrorEvent, HostValidationError, ModuleAddError};
use crate::host::hooks::{self, HookData};
use crate::host::id::ModuleId;
use crate::host::module::{HookHandler, MethodKind, Module, ModuleRecord};
use crate::util::lock;

/// Hooks the host emits itself, independent of any module.
pub const HOST_PROVIDED_HOOKS: [&str; 2] = [hooks::HOST_BOOT_STARTED, hooks::HOST_ERROR];

/// Minimum modules a host needs for safe operation.
pub const HOST_REQUIRED_MODULES: [&str; 2] = ["plugin:core:logger", "plugin:core:utilities"];

/// Composition phase; `add_module` is only legal while assembling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Assembling,
    Booting,
    Running,
}

/// A delegated host method and its owner, for introspection.
#[derive(Debug, Clone)]
pub struct HostMethod {
    pub module: ModuleId,
    pub kind: MethodKind,
}

#[derive(Clone)]
struct HookListener {
    module: ModuleId,
    handler: HookHandler,
}

pub struct ModuleHost {
    symbol: String,
    state: Mutex<HostState>,
    modules: Mutex<Vec<Arc<dyn Module>>>,
    listeners: Mutex<HashMap<&'static str, Vec<HookListener>>>,
    methods: Mutex<BTreeMap<&'static str, HostMethod>>,
    commands: Mutex<Vec<Arc<dyn Command>>>,
    capabilities: CapabilityRegistry,
}

impl ModuleHost {
    pub fn new(symbol: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            symbol: symbol.into(),
            state: Mutex::new(HostState::Assembling),
            modules: Mutex::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            methods: Mutex::new(BTreeMap::new()),
            commands: Mutex::new(Vec::new()),
            capabilities: CapabilityRegistry::default(),
        })
    }

    /// Active market symbol, supplied by the bootstrap layer.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> HostState {
        *lock(&self.state)
    }

    pub(crate) fn ensure_assembling(&self) -> Result<(), ModuleAddError> {
        match self.state() {
            HostState::Assembling => Ok(()),
            _ => Err(ModuleAddError::AlreadyBooted),
        }
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Add a module pre-boot. The constructor performs its own declaration
    /// validation (see `ModuleBuilder::attach`); on success the instance is
    /// appended to the registered set.
    pub fn add_module<M, F>(self: &Arc<Self>, construct: F) -> Result<Arc<M>, ModuleAddError>
    where
        M: Module + 'static,
        F: FnOnce(&Arc<ModuleHost>) -> Result<Arc<M>, ModuleAddError>,
    {
        self.ensure_assembling()?;

        let module = construct(self)?;
        lock(&self.modules).push(Arc::clone(&module) as Arc<dyn Module>);
        Ok(module)
    }

    pub fn has_module(&self, id: &ModuleId) -> bool {
        lock(&self.modules).iter().any(|m| m.id() == id)
    }

    pub(crate) fn add_listener(&self, hook: &'static str, module: ModuleId, handler: HookHandler) {
        lock(&self.listeners)
            .entry(hook)
            .or_default()
            .push(HookListener { module, handler });
    }

    /// Reserve the method names a module declares. Either every name is
    /// free and all are claimed, or nothing is.
    pub(crate) fn claim_methods(&self, record: &ModuleRecord) -> Result<(), ModuleAddError> {
        let mut methods = lock(&self.methods);

        let claims = record
            .host_methods
            .iter()
            .map(|name| (*name, MethodKind::Sync))
            .chain(
                record
                    .async_host_methods
                    .iter()
                    .map(|name| (*name, MethodKind::Async)),
            );

        let mut seen = HashSet::new();
        for (name, _) in claims.clone() {
            if let Some(existing) = methods.get(name) {
                return Err(ModuleAddError::MethodCollision {
                    module: record.id.clone(),
                    method: name,
                    owner: existing.module.clone(),
                });
            }

            if !seen.insert(name) {
                return Err(ModuleAddError::MethodCollision {
                    module: record.id.clone(),
                    method: name,
                    owner: record.id.clone(),
                });
            }
        }

        for (name, kind) in claims {
            methods.insert(
                name,
                HostMethod {
                    module: record.id.clone(),
                    kind,
                },
            );
        }

        Ok(())
    }

    /// Register a capability implementation for resolution by trait type.
    pub fn provide<T>(&self, owner: &ModuleId, capability: Arc<T>) -> Result<(), ModuleAddError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.provide(owner, capability)
    }

    /// Resolve a capability by trait type.
    pub fn capability<T>(&self) -> anyhow::Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.resolve::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "no provider registered for capability {}",
                std::any::type_name::<T>()
            )
        })
    }

    pub(crate) fn register_command(&self, command: Arc<dyn Command>) {
        lock(&self.commands).push(command);
    }

    // =========================================================================
    // Event bus
    // =========================================================================

    /// Emit a hook, awaiting every listener in registration order.
    ///
    /// Listener failures are isolated: each is rerouted to the fallback
    /// `host:error` hook and never aborts dispatch of the remaining
    /// listeners or propagates to the emitter. Failures of `host:error`
    /// listeners themselves are traced and dropped.
    pub async fn emit(&self, hook: &'static str, data: HookData) {
        let failures = self.dispatch(hook, data).await;
        if failures.is_empty() {
            return;
        }

        if hook == hooks::HOST_ERROR {
            for (module, message) in failures {
                error!(module = %module, %message, "fallback error hook listener failed");
            }
            return;
        }

        for (module, message) in failures {
            warn!(module = %module, hook, %message, "hook listener failed, rerouting");

            let event = ErrorEvent::Handler {
                module,
                hook,
                message,
            };
            let secondary = self
                .dispatch(hooks::HOST_ERROR, HookData::Error(event))
                .await;

            for (module, message) in secondary {
                error!(module = %module, %message, "fallback error hook listener failed");
            }
        }
    }

    /// Run every listener for a hook, collecting failures per module.
    async fn dispatch(&self, hook: &'static str, data: HookData) -> Vec<(ModuleId, String)> {
        let listeners: Vec<HookListener> = lock(&self.listeners)
            .get(hook)
            .cloned()
            .unwrap_or_default();

        let mut failures = Vec::new();
        for listener in listeners {
            if let Err(e) = (listener.handler)(data.clone()).await {
                failures.push((listener.module.clone(), format!("{e:#}")));
            }
        }

        failures
    }

    // =========================================================================
    // Validation + boot
    // =========================================================================

    /// Check that every statically-required host module is registered.
    pub fn validate_host_requirements(&self) -> Result<(), HostValidationError> {
        for required in HOST_REQUIRED_MODULES {
            let registered = lock(&self.modules)
                .iter()
                .any(|m| m.id().as_str() == required);

            if !registered {
                return Err(HostValidationError::MissingHostModule(
                    required.to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Validate the whole dependency graph: every module's required hooks
    /// against the union of module-provided and host-provided hooks, and
    /// every required module ID against the registered set.
    pub fn validate_module_requirements(&self) -> Result<(), HostValidationError> {
        let modules = self.modules();

        let provided: HashSet<&str> = HOST_PROVIDED_HOOKS
            .iter()
            .copied()
            .chain(modules.iter().flat_map(|m| m.provided_hooks().iter().copied()))
            .collect();
        let ids: HashSet<&str> = modules.iter().map(|m| m.id().as_str()).collect();

        for module in &modules {
            for hook in module.required_hooks() {
                if !provided.contains(hook) {
                    return Err(HostValidationError::MissingHook {
                        module: module.id().clone(),
                        hook: (*hook).to_string(),
                    });
                }
            }

            for required in module.required_modules() {
                if !ids.contains(required.as_str()) {
                    return Err(HostValidationError::MissingModule {
                        module: module.id().clone(),
                        required: required.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Boot the host: validate the module graph, self-test the fallback
    /// error path, then emit the boot-start hook and transition to
    /// `Running` once every listener settled.
    ///
    /// Validation failures leave no side effects; the host returns to
    /// `Assembling`. Calling boot on a booted host is a programming error.
    pub async fn boot(&self) -> Result<(), BootError> {
        {
            let mut state = lock(&self.state);
            if *state != HostState::Assembling {
                return Err(BootError::AlreadyBooted);
            }
            *state = HostState::Booting;
        }

        let validated = self
            .validate_host_requirements()
            .and_then(|()| self.validate_module_requirements());

        if let Err(e) = validated {
            *lock(&self.state) = HostState::Assembling;
            return Err(e.into());
        }

        // Confirm the fallback error path itself cannot fail before real
        // operation begins; once running, a throwing error handler would
        // leave no safe way to report anything.
        let failures = self
            .dispatch(hooks::HOST_ERROR, HookData::Error(ErrorEvent::SelfTest))
            .await;

        if let Some((module, message)) = failures.into_iter().next() {
            return Err(BootError::SelfTest { module, message });
        }

        let timer = match self
            .capability::<dyn crate::plugins::core::utilities::UtilitiesApi>()
        {
            Ok(utilities) => Some(utilities.log_duration("host boot").await),
            Err(_) => None,
        };

        self.emit(hooks::HOST_BOOT_STARTED, HookData::None).await;

        match timer {
            Some(timer) => {
                timer.finish().await;
            }
            None => info!("host boot hook settled"),
        }

        *lock(&self.state) = HostState::Running;
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn modules(&self) -> Vec<Arc<dyn Module>> {
        lock(&self.modules).clone()
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        lock(&self.modules).iter().map(|m| m.id().clone()).collect()
    }

    /// Hooks provided by the module(s) registered under an ID.
    pub fn module_provided_hooks(&self, id: &ModuleId) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for module in lock(&self.modules).iter().filter(|m| m.id() == id) {
            for hook in module.provided_hooks() {
                if !seen.contains(hook) {
                    seen.push(*hook);
                }
            }
        }
        seen
    }

    /// Deduplicated union of host-provided hooks and every module's
    /// provided hooks, in declaration order.
    pub fn all_provided_hooks(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for hook in HOST_PROVIDED_HOOKS
            .iter()
            .copied()
            .chain(
                lock(&self.modules)
                    .iter()
                    .flat_map(|m| m.provided_hooks().to_vec()),
            )
        {
            if !seen.contains(&hook) {
                seen.push(hook);
            }
        }
        seen
    }

    /// Map of every delegated host method to its owner.
    ///
    /// Recomputed from module records; a duplicate claim is structurally
    /// impossible given the construction-time collision guard, so finding
    /// one here is an invariant violation, not a normal-path error.
    pub fn host_methods(&self) -> Result<BTreeMap<&'static str, HostMethod>, HostValidationError> {
        let mut methods: BTreeMap<&'static str, HostMethod> = BTreeMap::new();

        for module in lock(&self.modules).iter() {
            let record = module.core().record();
            let named = record
                .host_methods
                .iter()
                .map(|n| (*n, MethodKind::Sync))
                .chain(
                    record
                        .async_host_methods
                        .iter()
                        .map(|n| (*n, MethodKind::Async)),
                );

            for (name, kind) in named {
                if let Some(existing) = methods.get(name) {
                    return Err(HostValidationError::DuplicateHostMethod {
                        method: name.to_string(),
                        first: existing.module.clone(),
                        second: record.id.clone(),
                    });
                }

                methods.insert(
                    name,
                    HostMethod {
                        module: record.id.clone(),
                        kind,
                    },
                );
            }
        }

        Ok(methods)
    }

    /// Capability owners, for diagnostics.
    pub fn capability_owners(&self) -> Vec<(&'static str, ModuleId)> {
        self.capabilities.owners()
    }

    /// Registered console commands, in registration order.
    pub fn commands(&self) -> Vec<Arc<dyn Command>> {
        lock(&self.commands).clone()
    }
}
