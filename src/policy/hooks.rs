/*!
 * Policy Hooks
 * Closure-based policy supplied by the embedder at sandbox construction
 */

use super::decision::PolicyDecision;
use super::traits::Policy;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

pub type ReadHook = dyn Fn(&Value, &Value) -> PolicyDecision + Send + Sync;
pub type WriteHook = dyn Fn(&Value, &Value, &Value) -> PolicyDecision + Send + Sync;
pub type CallHook = dyn Fn(&Value, &[Value]) -> PolicyDecision + Send + Sync;
pub type EnumerateHook = dyn Fn(&Value, &Value) -> bool + Send + Sync;

/// Up to four optional hooks; a missing hook allows without substitution
///
/// # Example
/// ```ignore
/// let hooks = PolicyHooks::new()
///     .on_write(|_obj, key, _value| match key.as_str() {
///         Some(k) if k.eq_ignore_ascii_case("destroy") => PolicyDecision::deny("destroy is blocked"),
///         _ => PolicyDecision::Allow,
///     })
///     .on_enumerate(|_obj, key| !key.as_str().is_some_and(|k| k.starts_with('_')));
/// ```
#[derive(Clone, Default)]
pub struct PolicyHooks {
    on_read: Option<Arc<ReadHook>>,
    on_write: Option<Arc<WriteHook>>,
    on_call: Option<Arc<CallHook>>,
    on_enumerate: Option<Arc<EnumerateHook>>,
}

impl PolicyHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks that allow everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Decide reads: `(raw_object, key)`
    pub fn on_read<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &Value) -> PolicyDecision + Send + Sync + 'static,
    {
        self.on_read = Some(Arc::new(hook));
        self
    }

    /// Decide writes: `(raw_object, key, raw_value)`
    pub fn on_write<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &Value, &Value) -> PolicyDecision + Send + Sync + 'static,
    {
        self.on_write = Some(Arc::new(hook));
        self
    }

    /// Decide calls: `(raw_callable, raw_args)`
    pub fn on_call<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> PolicyDecision + Send + Sync + 'static,
    {
        self.on_call = Some(Arc::new(hook));
        self
    }

    /// Keep a member during enumeration: `(raw_object, key) -> keep`
    pub fn on_enumerate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.on_enumerate = Some(Arc::new(hook));
        self
    }

    pub fn has_read_hook(&self) -> bool {
        self.on_read.is_some()
    }

    pub fn has_write_hook(&self) -> bool {
        self.on_write.is_some()
    }

    pub fn has_call_hook(&self) -> bool {
        self.on_call.is_some()
    }

    pub fn has_enumerate_hook(&self) -> bool {
        self.on_enumerate.is_some()
    }
}

impl Policy for PolicyHooks {
    fn name(&self) -> &str {
        "hooks"
    }

    fn check_read(&self, object: &Value, key: &Value) -> PolicyDecision {
        match &self.on_read {
            Some(hook) => hook(object, key),
            None => PolicyDecision::Allow,
        }
    }

    fn check_write(&self, object: &Value, key: &Value, value: &Value) -> PolicyDecision {
        match &self.on_write {
            Some(hook) => hook(object, key, value),
            None => PolicyDecision::Allow,
        }
    }

    fn check_call(&self, callee: &Value, args: &[Value]) -> PolicyDecision {
        match &self.on_call {
            Some(hook) => hook(callee, args),
            None => PolicyDecision::Allow,
        }
    }

    fn filter_members(&self, object: &Value, keys: &mut Vec<Value>) {
        if let Some(hook) = &self.on_enumerate {
            keys.retain(|key| hook(object, key));
        }
    }
}

impl fmt::Debug for PolicyHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyHooks")
            .field("on_read", &self.has_read_hook())
            .field("on_write", &self.has_write_hook())
            .field("on_call", &self.has_call_hook())
            .field("on_enumerate", &self.has_enumerate_hook())
            .finish()
    }
}
