//! Module host core
//!
//! The composition framework every feature plugs into: validated module
//! identities, a typed hook bus with per-listener failure isolation, a
//! capability registry replacing dynamic host-method installation, and the
//! two-phase boot protocol.

pub mod capability;
pub mod error;
pub mod hooks;
pub mod id;
pub mod module;
pub mod module_host;

pub use error::{BootError, ErrorEvent, HostValidationError, ModuleAddError, ValidationError, ValidationErrors};
pub use hooks::{HookData, Notification, NotificationLevel, TradeGroup};
pub use id::ModuleId;
pub use module::{MethodKind, Module, ModuleBuilder, ModuleCore, ModuleRecord, Plugin};
pub use module_host::{HostMethod, HostState, ModuleHost, HOST_PROVIDED_HOOKS, HOST_REQUIRED_MODULES};
