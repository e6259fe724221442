/*!
 * Weak Value Handles
 * Non-owning references to the reference kinds of `Value`
 */

use crate::core::id::ValueId;
use crate::sandbox::{ProxyCell, ProxyHandle};
use crate::value::{Function, FunctionCell, HostObject, Object, Table, TableCell, Value};
use std::sync::Weak;

/// Weak counterpart of a reference value
#[derive(Clone)]
pub(crate) enum WeakValue {
    Table(Weak<TableCell>),
    Function(Weak<FunctionCell>),
    Object(Weak<dyn HostObject>),
    Proxy(Weak<ProxyCell>),
}

impl WeakValue {
    /// Downgrade a reference value; scalars have no weak form
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Table(t) => Some(WeakValue::Table(t.downgrade())),
            Value::Function(f) => Some(WeakValue::Function(f.downgrade())),
            Value::Object(o) => Some(WeakValue::Object(o.downgrade())),
            Value::Proxy(p) => Some(WeakValue::Proxy(p.downgrade())),
            _ => None,
        }
    }

    pub(crate) fn upgrade(&self) -> Option<Value> {
        match self {
            WeakValue::Table(w) => w.upgrade().map(|c| Value::Table(Table::from_cell(c))),
            WeakValue::Function(w) => w
                .upgrade()
                .map(|c| Value::Function(Function::from_cell(c))),
            WeakValue::Object(w) => w.upgrade().map(|o| Value::Object(Object::from_arc(o))),
            WeakValue::Proxy(w) => w.upgrade().map(|c| Value::Proxy(ProxyHandle::from_cell(c))),
        }
    }

    /// Liveness check that never creates a strong reference
    pub(crate) fn is_alive(&self) -> bool {
        match self {
            WeakValue::Table(w) => w.strong_count() > 0,
            WeakValue::Function(w) => w.strong_count() > 0,
            WeakValue::Object(w) => w.strong_count() > 0,
            WeakValue::Proxy(w) => w.strong_count() > 0,
        }
    }
}

/// One (raw, proxy) association, indexed from both sides
#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) raw_id: ValueId,
    pub(crate) proxy_id: ValueId,
    pub(crate) raw: WeakValue,
    pub(crate) proxy: WeakValue,
}

impl Entry {
    pub(crate) fn new(raw: &Value, proxy: &Value) -> Option<Self> {
        Some(Self {
            raw_id: raw.id()?,
            proxy_id: proxy.id()?,
            raw: WeakValue::from_value(raw)?,
            proxy: WeakValue::from_value(proxy)?,
        })
    }

    /// Both sides still reachable
    pub(crate) fn is_alive(&self) -> bool {
        self.raw.is_alive() && self.proxy.is_alive()
    }
}

/// Upgrade `weak` only if it still refers to the same allocation as `expected`
pub(crate) fn upgrade_matching(weak: &WeakValue, expected: ValueId) -> Option<Value> {
    weak.upgrade().filter(|v| v.id() == Some(expected))
}
