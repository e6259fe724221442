/*!
 * Error Types
 * Boundary error taxonomy with thiserror and miette diagnostics
 */

use crate::value::Value;
use miette::Diagnostic;
use thiserror::Error;

/// Result type for every operation that crosses the sandbox boundary
pub type MembraneResult<T> = Result<T, MembraneError>;

/// Reason recorded when a hook reports that its own evaluation timed out
pub const POLICY_TIMEOUT_REASON: &str = "policy evaluation timed out";

/// Errors surfaced at the sandbox boundary
///
/// Denials are recoverable and reported to the caller of the operation.
/// `UnboundProxyUse` and `CycleGuardTriggered` are programming faults.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum MembraneError {
    #[error("Access denied reading '{key}': {reason}")]
    #[diagnostic(
        code(membrane::access_denied),
        help("The read policy rejected this member. Check the embedder's on_read hook.")
    )]
    AccessDenied { key: String, reason: String },

    #[error("Write denied for '{key}': {reason}")]
    #[diagnostic(
        code(membrane::write_denied),
        help("The write policy rejected this assignment. The host object was not modified.")
    )]
    WriteDenied { key: String, reason: String },

    #[error("Call denied: {reason}")]
    #[diagnostic(
        code(membrane::call_denied),
        help("The call policy rejected this invocation. Check the embedder's on_call hook.")
    )]
    CallDenied { reason: String },

    #[error("Proxy used before registration completed")]
    #[diagnostic(
        code(membrane::unbound_proxy_use),
        help("Proxies are only valid once the identity registry has bound them. Please report this issue.")
    )]
    UnboundProxyUse,

    #[error("Cycle guard triggered: container visited twice in one conversion")]
    #[diagnostic(
        code(membrane::cycle_guard_triggered),
        help("A container was re-entered without a registry entry. Please report this issue.")
    )]
    CycleGuardTriggered,

    #[error("Nesting depth limit of {limit} exceeded")]
    #[diagnostic(
        code(membrane::depth_limit_exceeded),
        help("Raise SandboxConfig::max_depth or flatten the value being converted.")
    )]
    DepthLimitExceeded { limit: usize },

    #[error("Host object '{class}' is no longer alive")]
    #[diagnostic(
        code(membrane::detached),
        help("The host released this object. Use HandleRetention::Strong to keep proxied objects alive.")
    )]
    Detached { class: String },

    #[error("Operation '{operation}' not supported on {type_name}")]
    #[diagnostic(code(membrane::not_supported))]
    NotSupported {
        operation: &'static str,
        type_name: String,
    },

    #[error("Value of type {type_name} is not callable")]
    #[diagnostic(code(membrane::not_callable))]
    NotCallable { type_name: String },

    #[error("Raised: {0}")]
    #[diagnostic(code(membrane::raised))]
    Raised(Value),

    #[error("Host error: {message}")]
    #[diagnostic(code(membrane::host))]
    Host { message: String },
}

impl MembraneError {
    /// Create a host error
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Raise a value as a fault
    pub fn raise(value: impl Into<Value>) -> Self {
        Self::Raised(value.into())
    }

    /// True for policy rejections
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied { .. } | Self::WriteDenied { .. } | Self::CallDenied { .. }
        )
    }

    /// True for faults that indicate a bug rather than a runtime condition
    pub fn is_programming_fault(&self) -> bool {
        matches!(self, Self::UnboundProxyUse | Self::CycleGuardTriggered)
    }

    /// Payload of a raised fault, if any
    pub fn raised_value(&self) -> Option<&Value> {
        match self {
            Self::Raised(value) => Some(value),
            _ => None,
        }
    }
}

impl From<String> for MembraneError {
    fn from(msg: String) -> Self {
        MembraneError::Host { message: msg }
    }
}

impl From<&str> for MembraneError {
    fn from(msg: &str) -> Self {
        MembraneError::Host {
            message: msg.to_string(),
        }
    }
}
