/*!
 * Value Model
 * Host and sandbox values exchanged across the boundary
 *
 * ## Realms
 * Tables and functions carry a realm tag telling which side of the boundary
 * created them. Host objects always live in the host realm and proxies always
 * live in the sandbox realm. Scalars carry no capability and belong to neither.
 *
 * ## Identity
 * Reference values compare and hash by allocation identity, scalars by value.
 * This is what makes `wrap(v) == wrap(v)` a reference-equality check.
 */

mod function;
mod host;
mod table;

pub use function::{Function, FunctionCell, NativeFn};
pub use host::{HostObject, Object};
pub use table::{Table, TableCell};

use crate::core::id::ValueId;
use crate::sandbox::ProxyHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Side of the boundary that created a container or callable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Realm {
    Host,
    Sandbox,
}

/// A value on either side of the boundary
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Aggregate container (map or sequence)
    Table(Table),
    /// Callable
    Function(Function),
    /// Opaque host handle
    Object(Object),
    /// Sandbox stand-in for a host object
    Proxy(ProxyHandle),
}

impl Value {
    /// Create a string value
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
            Value::Proxy(_) => "proxy",
        }
    }

    /// Scalars carry no capability and need no identity tracking
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Realm of the value, `None` for scalars
    pub fn realm(&self) -> Option<Realm> {
        match self {
            Value::Table(t) => Some(t.realm()),
            Value::Function(f) => Some(f.realm()),
            Value::Object(_) => Some(Realm::Host),
            Value::Proxy(_) => Some(Realm::Sandbox),
            _ => None,
        }
    }

    /// Allocation identity, `None` for scalars
    pub fn id(&self) -> Option<ValueId> {
        match self {
            Value::Table(t) => Some(t.id()),
            Value::Function(f) => Some(f.id()),
            Value::Object(o) => Some(o.id()),
            Value::Proxy(p) => Some(p.id()),
            _ => None,
        }
    }

    /// Reference identity for reference values, value equality for scalars
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => match (self.id(), other.id()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&ProxyHandle> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            other => other.id().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Table(t) => write!(f, "table: {}", t.id()),
            Value::Function(func) => match func.name() {
                Some(name) => write!(f, "function: {}", name),
                None => write!(f, "function: {}", func.id()),
            },
            Value::Object(o) => f.write_str(o.class_name()),
            Value::Proxy(p) => write!(f, "proxy<{}>", p.class_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Table(t) => write!(f, "Table({:?}, {}, len={})", t.realm(), t.id(), t.len()),
            Value::Function(func) => write!(f, "Function({:?}, {})", func.realm(), func.id()),
            Value::Object(o) => write!(f, "Object({}, {})", o.class_name(), o.id()),
            Value::Proxy(p) => write!(f, "Proxy({}, {:?})", p.class_name(), p.state()),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<ProxyHandle> for Value {
    fn from(p: ProxyHandle) -> Self {
        Value::Proxy(p)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Nil)
    }
}
