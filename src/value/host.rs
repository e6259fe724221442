/*!
 * Host Object Model
 * Interface the embedder implements for opaque host handles
 */

use super::Value;
use crate::core::errors::{MembraneError, MembraneResult};
use crate::core::id::ValueId;
use std::fmt;
use std::sync::{Arc, Weak};

/// Primitives the sandbox consumes from the host object model
///
/// Implementations own their own synchronization. The sandbox never holds a
/// lock while calling into the host, so implementations may call back into
/// the sandbox.
pub trait HostObject: Send + Sync + 'static {
    /// Class name used in diagnostics and proxy display
    fn class_name(&self) -> &str;

    /// Read a property or method
    fn get(&self, key: &Value) -> MembraneResult<Value>;

    /// Assign a property
    fn set(&self, key: &Value, value: Value) -> MembraneResult<()>;

    /// Enumerate member keys
    fn members(&self) -> MembraneResult<Vec<Value>>;

    /// Whether `call` is supported
    fn is_callable(&self) -> bool {
        false
    }

    /// Invoke the object as a callable
    fn call(&self, _args: &[Value]) -> MembraneResult<Vec<Value>> {
        Err(MembraneError::NotCallable {
            type_name: self.class_name().to_string(),
        })
    }
}

/// Shared handle to a host object
#[derive(Clone)]
pub struct Object(Arc<dyn HostObject>);

impl Object {
    pub fn new(object: impl HostObject) -> Self {
        Self(Arc::new(object))
    }

    pub fn from_arc(object: Arc<dyn HostObject>) -> Self {
        Self(object)
    }

    pub fn id(&self) -> ValueId {
        ValueId::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        self.id() == other.id()
    }

    pub fn class_name(&self) -> &str {
        self.0.class_name()
    }

    pub fn host(&self) -> &dyn HostObject {
        self.0.as_ref()
    }

    pub fn as_arc(&self) -> &Arc<dyn HostObject> {
        &self.0
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn HostObject> {
        Arc::downgrade(&self.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}, {})", self.class_name(), self.id())
    }
}
