/*!
 * Proxy Factory
 * Recursive wrap/unwrap of values crossing the boundary
 *
 * Containers are registered before their contents are converted, so a
 * self-referencing table maps back onto the counterpart already under
 * construction instead of recursing. A per-call visited set backs this up.
 */

use super::interceptor::ProxyHandle;
use super::Sandbox;
use crate::core::errors::{MembraneError, MembraneResult};
use crate::core::id::ValueId;
use crate::value::{Function, Realm, Table, Value};
use ahash::HashSet;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Host to sandbox
    Wrap,
    /// Sandbox to host
    Unwrap,
}

/// State of one wrap or unwrap call
struct Walk<'a> {
    sandbox: &'a Sandbox,
    direction: Direction,
    /// Containers whose contents this call has started converting
    visited: HashSet<ValueId>,
}

impl<'a> Walk<'a> {
    fn new(sandbox: &'a Sandbox, direction: Direction) -> Self {
        Self {
            sandbox,
            direction,
            visited: HashSet::default(),
        }
    }

    fn convert(&mut self, value: &Value, depth: usize) -> MembraneResult<Value> {
        match self.direction {
            Direction::Wrap => self.wrap(value, depth),
            Direction::Unwrap => self.unwrap(value, depth),
        }
    }

    fn wrap(&mut self, value: &Value, depth: usize) -> MembraneResult<Value> {
        let sandbox = self.sandbox;
        let registry = sandbox.registry();
        match value {
            Value::Object(object) => {
                let retention = sandbox.config().handle_retention;
                let registration = registry.register(value, || {
                    Value::Proxy(ProxyHandle::unbound(object, retention))
                });
                if registration.created {
                    debug!(class = object.class_name(), id = %object.id(), "Wrapped host object");
                }
                Ok(registration.value)
            }
            Value::Function(function) if function.realm() == Realm::Host => {
                let registration =
                    registry.register(value, || sandbox.function_proxy(function));
                Ok(registration.value)
            }
            Value::Table(table) if table.realm() == Realm::Host => {
                let registration =
                    registry.register(value, || Value::Table(Table::with_realm(Realm::Sandbox)));
                if !registration.created {
                    return Ok(registration.value);
                }
                self.fill(value, table, registration.value, depth)
            }
            // Scalars, proxies and values born inside the sandbox
            _ => Ok(value.clone()),
        }
    }

    fn unwrap(&mut self, value: &Value, depth: usize) -> MembraneResult<Value> {
        let sandbox = self.sandbox;
        let registry = sandbox.registry();
        match value {
            Value::Proxy(proxy) => {
                if let Some(raw) = registry.raw_of(value) {
                    return Ok(raw);
                }
                if !proxy.is_bound() {
                    error!(class = proxy.class_name(), "Unwrap of a proxy that was never bound");
                    return Err(MembraneError::UnboundProxyUse);
                }
                proxy
                    .anchor()
                    .map(|object| Value::Object(object.clone()))
                    .ok_or_else(|| MembraneError::Detached {
                        class: proxy.class_name().to_string(),
                    })
            }
            Value::Function(function) if function.realm() == Realm::Sandbox => {
                let registration =
                    registry.register_mirror(value, || sandbox.function_mirror(function));
                Ok(registration.value)
            }
            Value::Table(table) if table.realm() == Realm::Sandbox => {
                let registration = registry.register_mirror(value, || Value::Table(Table::new()));
                if !registration.created {
                    return Ok(registration.value);
                }
                self.fill(value, table, registration.value, depth)
            }
            // Scalars and host-realm values pass back unchanged
            _ => Ok(value.clone()),
        }
    }

    /// Convert `source` entries into the freshly registered `counterpart`
    ///
    /// On failure the partial association is dropped so a later call
    /// starts over instead of reusing a half-built table.
    fn fill(
        &mut self,
        source_value: &Value,
        source: &Table,
        counterpart: Value,
        depth: usize,
    ) -> MembraneResult<Value> {
        let result = self.fill_entries(source_value, source, &counterpart, depth);
        match result {
            Ok(()) => Ok(counterpart),
            Err(e) => {
                self.sandbox.registry().forget(source_value);
                Err(e)
            }
        }
    }

    fn fill_entries(
        &mut self,
        source_value: &Value,
        source: &Table,
        counterpart: &Value,
        depth: usize,
    ) -> MembraneResult<()> {
        let limit = self.sandbox.config().max_depth;
        if depth >= limit {
            error!(limit, "Container nesting exceeds depth limit");
            return Err(MembraneError::DepthLimitExceeded { limit });
        }
        if !self.visited.insert(source.id()) {
            error!(id = %source.id(), "Container revisited while its counterpart is under construction");
            return Err(MembraneError::CycleGuardTriggered);
        }
        let Some(target) = counterpart.as_table() else {
            return Ok(());
        };

        // Host collections are screened like proxied objects
        let entries = match self.direction {
            Direction::Wrap => self.sandbox.screen_entries(source_value, source.entries()),
            Direction::Unwrap => source.entries(),
        };
        for (key, item) in entries {
            let key = self.convert(&key, depth + 1)?;
            let item = self.convert(&item, depth + 1)?;
            target.set(key, item);
        }
        Ok(())
    }
}

impl Sandbox {
    /// Convert a host value into its sandbox-safe form
    ///
    /// Host objects become proxies and host functions become policy-checked
    /// wrappers. Host tables become sandbox tables holding the converted
    /// entries that pass the enumerate filter and the read hook.
    /// Wrapping the same reference twice yields the same result.
    #[instrument(level = "trace", skip_all, fields(sandbox = %self.id()))]
    pub fn wrap(&self, value: &Value) -> MembraneResult<Value> {
        Walk::new(self, Direction::Wrap).convert(value, 0)
    }

    /// Convert a sandbox value back into the host value it stands for
    #[instrument(level = "trace", skip_all, fields(sandbox = %self.id()))]
    pub fn unwrap(&self, value: &Value) -> MembraneResult<Value> {
        Walk::new(self, Direction::Unwrap).convert(value, 0)
    }

    /// Wrap each value in order
    pub fn wrap_all(&self, values: &[Value]) -> MembraneResult<Vec<Value>> {
        let mut walk = Walk::new(self, Direction::Wrap);
        values.iter().map(|v| walk.convert(v, 0)).collect()
    }

    /// Unwrap each value in order
    pub fn unwrap_all(&self, values: &[Value]) -> MembraneResult<Vec<Value>> {
        let mut walk = Walk::new(self, Direction::Unwrap);
        values.iter().map(|v| walk.convert(v, 0)).collect()
    }

    /// Sandbox-side stand-in for a host function
    fn function_proxy(&self, raw: &Function) -> Value {
        let sandbox = self.clone();
        let target = Value::Function(raw.clone());
        Value::Function(Function::with_realm(
            Realm::Sandbox,
            raw.name_arc(),
            move |args| sandbox.invoke_raw(&target, args),
        ))
    }

    /// Host-side mirror of a function born inside the sandbox
    fn function_mirror(&self, guest: &Function) -> Value {
        let sandbox = self.clone();
        let guest = guest.clone();
        Value::Function(Function::with_realm(
            Realm::Host,
            guest.name_arc(),
            move |raw_args| {
                let args = sandbox.wrap_all(raw_args)?;
                match guest.invoke(&args) {
                    Ok(results) => sandbox.unwrap_all(&results),
                    Err(MembraneError::Raised(fault)) => {
                        Err(MembraneError::Raised(sandbox.unwrap(&fault)?))
                    }
                    Err(other) => Err(other),
                }
            },
        ))
    }
}
