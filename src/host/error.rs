//! Host and module error types
//!
//! Construction-time problems are aggregated into `ValidationErrors` so a
//! caller sees every defect of a module definition at once. Composition and
//! boot failures get their own enums; runtime dispatch failures never
//! surface as errors at all — they are rerouted to the fallback error hook
//! as `ErrorEvent` payloads.

use std::fmt;

use thiserror::Error;

use crate::host::id::ModuleId;

/// A single field that failed validation, with the offending value.
#[derive(Debug, Clone, Error)]
#[error("{message} [{value}]")]
pub struct ValidationError {
    pub message: String,
    pub value: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            value: value.into(),
        }
    }
}

/// All validation failures for one construction call, reported together.
#[derive(Debug, Error)]
#[error("{context}: {}", .errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationErrors {
    pub context: String,
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(context: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self {
            context: context.into(),
            errors,
        }
    }
}

/// Failure while adding a module to a host.
#[derive(Debug, Error)]
pub enum ModuleAddError {
    #[error("host already booted, modules must be added before boot")]
    AlreadyBooted,

    #[error("module {0} is unique but already present on host")]
    DuplicateUnique(ModuleId),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("module {module} host method would clobber {method} (owned by {owner})")]
    MethodCollision {
        module: ModuleId,
        method: &'static str,
        owner: ModuleId,
    },

    #[error("module {module} provides capability {capability} already owned by {owner}")]
    CapabilityCollision {
        module: ModuleId,
        capability: &'static str,
        owner: ModuleId,
    },

    #[error("module initialization failed: {0:#}")]
    Init(#[from] anyhow::Error),
}

/// Failure found while validating the aggregate module graph at boot.
#[derive(Debug, Error)]
pub enum HostValidationError {
    #[error("host requires module {0}, not registered")]
    MissingHostModule(String),

    #[error("module {module} requires module {required}, not registered")]
    MissingModule { module: ModuleId, required: ModuleId },

    #[error("module {module} requires hook {hook}, not provided by any module or the host")]
    MissingHook { module: ModuleId, hook: String },

    #[error("host method {method} claimed by both {first} and {second}")]
    DuplicateHostMethod {
        method: String,
        first: ModuleId,
        second: ModuleId,
    },
}

/// Failure of the boot sequence; fatal, there is no degraded boot mode.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("host already booted")]
    AlreadyBooted,

    #[error(transparent)]
    Validation(#[from] HostValidationError),

    #[error("error handler self-test failed in module {module}: {message}")]
    SelfTest { module: ModuleId, message: String },
}

/// Payload of the fallback `host:error` hook.
///
/// `SelfTest` is an inert instance emitted once during boot to confirm the
/// fallback path itself cannot fail; consumers that surface errors to a
/// human must recognize and suppress exactly that variant.
#[derive(Debug, Clone)]
pub enum ErrorEvent {
    SelfTest,

    /// A hook listener returned an error; isolated at the dispatch boundary.
    Handler {
        module: ModuleId,
        hook: &'static str,
        message: String,
    },

    /// A module reported a failure outside of hook dispatch (e.g. a stream
    /// callback or a fire-and-forget emit).
    Module { module: ModuleId, message: String },
}

impl ErrorEvent {
    pub fn is_self_test(&self) -> bool {
        matches!(self, Self::SelfTest)
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfTest => write!(f, "error handler self-test"),
            Self::Handler {
                module,
                hook,
                message,
            } => write!(f, "{module} failed handling {hook}: {message}"),
            Self::Module { module, message } => write!(f, "{module}: {message}"),
        }
    }
}
