/*!
 * Sandbox Configuration
 */

use crate::core::limits::{
    DEFAULT_AUDIT_CAPACITY, DEFAULT_MAX_DEPTH, DEFAULT_SWEEP_INTERVAL, ENV_AUDIT, ENV_MAX_DEPTH,
    ENV_SWEEP_INTERVAL, PERMISSIVE_MAX_DEPTH, STRICT_AUDIT_CAPACITY, STRICT_MAX_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// How a proxy refers to the host object it stands in for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleRetention {
    /// Only the host keeps objects alive; proxies of reclaimed objects report `Detached`
    Weak,
    /// Proxies keep their host object alive
    #[default]
    Strong,
}

/// Sandbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Deepest container nesting followed by one wrap/unwrap call
    pub max_depth: usize,
    /// Registrations between automatic registry sweeps, 0 disables them
    pub sweep_interval: u64,
    pub handle_retention: HandleRetention,
    /// Record policy decisions in the audit trail
    pub audit: bool,
    pub audit_capacity: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            handle_retention: HandleRetention::Strong,
            audit: false,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

impl SandboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow conversions with every decision audited
    pub fn strict() -> Self {
        Self {
            max_depth: STRICT_MAX_DEPTH,
            audit: true,
            audit_capacity: STRICT_AUDIT_CAPACITY,
            ..Self::default()
        }
    }

    /// Deep conversions without auditing
    pub fn permissive() -> Self {
        Self {
            max_depth: PERMISSIVE_MAX_DEPTH,
            ..Self::default()
        }
    }

    /// Defaults overridden by `MEMBRANE_*` environment variables
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_sweep_interval(mut self, interval: u64) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_handle_retention(mut self, retention: HandleRetention) -> Self {
        self.handle_retention = retention;
        self
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(depth) = parse_var(&lookup, ENV_MAX_DEPTH) {
            self.max_depth = depth;
        }
        if let Some(interval) = parse_var(&lookup, ENV_SWEEP_INTERVAL) {
            self.sweep_interval = interval;
        }
        if let Some(raw) = lookup(ENV_AUDIT) {
            self.audit = raw == "1" || raw.eq_ignore_ascii_case("true");
        }
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable configuration override");
            None
        }
    }
}
