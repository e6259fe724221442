/*!
 * Access Interceptor
 * Per-proxy dispatch of read, write, call and enumerate through policy
 *
 * ## Lifecycle
 * - `Unbound`: constructed, registration in progress
 * - `Bound`: registered, serving accesses
 * - `Collected`: no live references, only observable through the registry
 *
 * Every operation resolves the raw host object through the identity registry,
 * consults the policy with raw values only, and wraps whatever flows back so
 * no raw reference reaches the sandbox.
 */

use super::config::HandleRetention;
use super::Sandbox;
use crate::core::errors::{MembraneError, MembraneResult};
use crate::core::id::ValueId;
use crate::monitoring::span_host_call;
use crate::policy::{Operation, PolicyDecision};
use crate::value::{Object, Realm, Value};
use ahash::HashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, instrument, warn};

const UNBOUND: u8 = 0;
const BOUND: u8 = 1;

/// Reason recorded for members removed by the enumerate filter
const FILTERED_REASON: &str = "filtered from enumeration";

/// Proxy lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyState {
    Unbound,
    Bound,
    Collected,
}

/// Backing storage of a proxy
pub struct ProxyCell {
    class: Arc<str>,
    state: AtomicU8,
    /// Present only under `HandleRetention::Strong`
    anchor: Option<Object>,
}

/// Sandbox stand-in for one host object
#[derive(Clone)]
pub struct ProxyHandle(Arc<ProxyCell>);

impl ProxyHandle {
    pub(crate) fn unbound(object: &Object, retention: HandleRetention) -> Self {
        let anchor = match retention {
            HandleRetention::Strong => Some(object.clone()),
            HandleRetention::Weak => None,
        };
        Self(Arc::new(ProxyCell {
            class: Arc::from(object.class_name()),
            state: AtomicU8::new(UNBOUND),
            anchor,
        }))
    }

    /// Called by the registry once both indices hold the association
    pub(crate) fn bind(&self) {
        self.0.state.store(BOUND, Ordering::Release);
    }

    pub fn state(&self) -> ProxyState {
        match self.0.state.load(Ordering::Acquire) {
            BOUND => ProxyState::Bound,
            _ => ProxyState::Unbound,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.state() == ProxyState::Bound
    }

    /// Class name of the host object, captured at wrap time
    pub fn class_name(&self) -> &str {
        &self.0.class
    }

    pub fn id(&self) -> ValueId {
        ValueId::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &ProxyHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn anchor(&self) -> Option<&Object> {
        self.0.anchor.as_ref()
    }

    pub(crate) fn downgrade(&self) -> Weak<ProxyCell> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn from_cell(cell: Arc<ProxyCell>) -> Self {
        Self(cell)
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("class", &self.class_name())
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl Sandbox {
    /// Read `key` through a proxy
    ///
    /// Sandbox-realm tables are read directly; their contents were already
    /// converted and screened when they crossed the boundary.
    #[instrument(level = "debug", skip_all, fields(sandbox = %self.id(), key = %key))]
    pub fn read(&self, target: &Value, key: &Value) -> MembraneResult<Value> {
        match target {
            Value::Proxy(proxy) => {
                let object = self.resolve(proxy)?;
                let raw_target = Value::Object(object.clone());
                let raw_key = self.unwrap(key)?;

                match self.checked_read(&raw_target, &raw_key) {
                    PolicyDecision::Allow => {
                        let value = object
                            .host()
                            .get(&raw_key)
                            .map_err(|e| self.wrap_fault(e))?;
                        self.wrap(&value)
                    }
                    PolicyDecision::Substitute(value) => self.wrap(&value),
                    denied => {
                        let reason = denied.denial_reason().unwrap_or_default().to_string();
                        warn!(class = object.class_name(), key = %raw_key, %reason, "Read denied");
                        Err(MembraneError::AccessDenied {
                            key: raw_key.to_string(),
                            reason,
                        })
                    }
                }
            }
            Value::Table(table) if table.realm() == Realm::Sandbox => Ok(table.get(key.clone())),
            other => Err(not_supported("read", other)),
        }
    }

    /// Assign `value` to `key` through a proxy
    ///
    /// A denied write leaves the host object untouched.
    #[instrument(level = "debug", skip_all, fields(sandbox = %self.id(), key = %key))]
    pub fn write(&self, target: &Value, key: &Value, value: &Value) -> MembraneResult<()> {
        match target {
            Value::Proxy(proxy) => {
                let object = self.resolve(proxy)?;
                let raw_target = Value::Object(object.clone());
                let raw_key = self.unwrap(key)?;
                let raw_value = self.unwrap(value)?;

                let decision = self
                    .policy()
                    .check_write(&raw_target, &raw_key, &raw_value);
                self.record(Operation::Write, &raw_target, Some(&raw_key), &decision);

                let assigned = match decision {
                    PolicyDecision::Allow => raw_value,
                    PolicyDecision::Substitute(substitute) => substitute,
                    denied => {
                        let reason = denied.denial_reason().unwrap_or_default().to_string();
                        warn!(class = object.class_name(), key = %raw_key, %reason, "Write denied");
                        return Err(MembraneError::WriteDenied {
                            key: raw_key.to_string(),
                            reason,
                        });
                    }
                };

                object
                    .host()
                    .set(&raw_key, assigned)
                    .map_err(|e| self.wrap_fault(e))
            }
            Value::Table(table) if table.realm() == Realm::Sandbox => {
                table.set(key.clone(), value.clone());
                Ok(())
            }
            other => Err(not_supported("write", other)),
        }
    }

    /// Invoke a proxied or wrapped callable
    ///
    /// Arguments are unwrapped before the policy sees them and results are
    /// wrapped on the way back. A raised fault has its payload wrapped too.
    #[instrument(level = "debug", skip_all, fields(sandbox = %self.id(), args = args.len()))]
    pub fn call(&self, callee: &Value, args: &[Value]) -> MembraneResult<Vec<Value>> {
        match callee {
            Value::Proxy(proxy) => {
                let object = self.resolve(proxy)?;
                if !object.host().is_callable() {
                    return Err(MembraneError::NotCallable {
                        type_name: object.class_name().to_string(),
                    });
                }
                self.invoke_raw(&Value::Object(object), args)
            }
            Value::Function(function) => match self.registry().raw_of(callee) {
                Some(raw) => self.invoke_raw(&raw, args),
                // Born inside the sandbox, nothing to intercept
                None if function.realm() == Realm::Sandbox => function.invoke(args),
                None => self.invoke_raw(callee, args),
            },
            other => Err(MembraneError::NotCallable {
                type_name: other.type_name().to_string(),
            }),
        }
    }

    /// List members through a proxy, filtered by policy, as wrapped `(key, value)` pairs
    ///
    /// Each surviving member goes through the read hook as well. Denied
    /// members are left out and substitutes replace the host value.
    #[instrument(level = "debug", skip_all, fields(sandbox = %self.id()))]
    pub fn enumerate(&self, target: &Value) -> MembraneResult<Vec<(Value, Value)>> {
        match target {
            Value::Proxy(proxy) => {
                let object = self.resolve(proxy)?;
                let raw_target = Value::Object(object.clone());
                let members = object.host().members().map_err(|e| self.wrap_fault(e))?;
                let visible = self.visible_members(&raw_target, &members);

                let mut entries = Vec::with_capacity(visible.len());
                for key in &visible {
                    let value = match self.checked_read(&raw_target, key) {
                        PolicyDecision::Allow => {
                            object.host().get(key).map_err(|e| self.wrap_fault(e))?
                        }
                        PolicyDecision::Substitute(value) => value,
                        denied => {
                            debug!(
                                class = object.class_name(),
                                key = %key,
                                reason = denied.denial_reason().unwrap_or_default(),
                                "Member withheld from enumeration"
                            );
                            continue;
                        }
                    };
                    entries.push((self.wrap(key)?, self.wrap(&value)?));
                }
                Ok(entries)
            }
            Value::Table(table) if table.realm() == Realm::Sandbox => Ok(table.entries()),
            other => Err(not_supported("enumerate", other)),
        }
    }

    /// Policy-checked invocation of a raw callable with sandbox arguments
    pub(crate) fn invoke_raw(&self, raw_callee: &Value, args: &[Value]) -> MembraneResult<Vec<Value>> {
        let raw_args = self.unwrap_all(args)?;

        let decision = self.policy().check_call(raw_callee, &raw_args);
        self.record(Operation::Call, raw_callee, None, &decision);

        match decision {
            PolicyDecision::Allow => {
                let span = span_host_call(&raw_callee.to_string(), raw_args.len());
                let outcome = {
                    let _entered = span.enter();
                    match raw_callee {
                        Value::Function(function) => function.invoke(&raw_args),
                        Value::Object(object) => object.host().call(&raw_args),
                        other => Err(MembraneError::NotCallable {
                            type_name: other.type_name().to_string(),
                        }),
                    }
                };
                match &outcome {
                    Ok(_) => span.record_result(true),
                    Err(e) => span.record_error(&e.to_string()),
                }
                drop(span);

                let results = outcome.map_err(|e| self.wrap_fault(e))?;
                self.wrap_all(&results)
            }
            PolicyDecision::Substitute(value) => Ok(vec![self.wrap(&value)?]),
            denied => {
                let reason = denied.denial_reason().unwrap_or_default().to_string();
                warn!(callee = %raw_callee, %reason, "Call denied");
                Err(MembraneError::CallDenied { reason })
            }
        }
    }

    /// Read decision for one member, recorded in the audit trail
    fn checked_read(&self, raw_target: &Value, raw_key: &Value) -> PolicyDecision {
        let decision = self.policy().check_read(raw_target, raw_key);
        self.record(Operation::Read, raw_target, Some(raw_key), &decision);
        decision
    }

    /// Members of `raw_target` that survive the enumerate filter
    fn visible_members(&self, raw_target: &Value, members: &[Value]) -> Vec<Value> {
        let mut visible = members.to_vec();
        self.policy().filter_members(raw_target, &mut visible);

        if self.audit().is_some() && visible.len() < members.len() {
            let kept: HashSet<&Value> = visible.iter().collect();
            let filtered = PolicyDecision::deny(FILTERED_REASON);
            for key in members.iter().filter(|k| !kept.contains(k)) {
                self.record(Operation::Enumerate, raw_target, Some(key), &filtered);
            }
        }
        visible
    }

    /// Entries of a host table that may cross into the sandbox
    ///
    /// Applies the same member filter and read hook as a proxied object, so
    /// the sandbox copy never holds what `enumerate` or `read` would withhold.
    pub(crate) fn screen_entries(
        &self,
        raw_table: &Value,
        entries: Vec<(Value, Value)>,
    ) -> Vec<(Value, Value)> {
        let keys: Vec<Value> = entries.iter().map(|(key, _)| key.clone()).collect();
        let visible: HashSet<Value> = self.visible_members(raw_table, &keys).into_iter().collect();

        entries
            .into_iter()
            .filter(|(key, _)| visible.contains(key))
            .filter_map(|(key, item)| match self.checked_read(raw_table, &key) {
                PolicyDecision::Allow => Some((key, item)),
                PolicyDecision::Substitute(value) => Some((key, value)),
                _ => None,
            })
            .collect()
    }

    /// Raw host object behind a bound proxy
    fn resolve(&self, proxy: &ProxyHandle) -> MembraneResult<Object> {
        if !proxy.is_bound() {
            error!(class = proxy.class_name(), "Proxy used before it was bound");
            return Err(MembraneError::UnboundProxyUse);
        }
        match self.registry().raw_of(&Value::Proxy(proxy.clone())) {
            Some(Value::Object(object)) => Ok(object),
            _ => proxy
                .anchor()
                .cloned()
                .ok_or_else(|| MembraneError::Detached {
                    class: proxy.class_name().to_string(),
                }),
        }
    }

    /// Wrap the payload of a raised fault so it cannot leak a raw reference
    pub(crate) fn wrap_fault(&self, err: MembraneError) -> MembraneError {
        match err {
            MembraneError::Raised(payload) => match self.wrap(&payload) {
                Ok(wrapped) => MembraneError::Raised(wrapped),
                Err(e) => {
                    error!(fault = %payload, error = %e, "Raised payload could not be wrapped");
                    e
                }
            },
            other => other,
        }
    }
}

fn not_supported(operation: &'static str, value: &Value) -> MembraneError {
    MembraneError::NotSupported {
        operation,
        type_name: value.type_name().to_string(),
    }
}
