/*!
 * Function
 * Native callables exchanged across the boundary
 */

use super::{Realm, Value};
use crate::core::errors::MembraneResult;
use crate::core::id::ValueId;
use std::sync::{Arc, Weak};

/// Signature of every callable: positional arguments in, multiple results out.
/// A thrown fault is reported as `MembraneError::Raised(value)`.
pub type NativeFn = dyn Fn(&[Value]) -> MembraneResult<Vec<Value>> + Send + Sync;

/// Backing storage of a function
pub struct FunctionCell {
    realm: Realm,
    name: Option<Arc<str>>,
    body: Box<NativeFn>,
}

/// Reference-counted handle to a callable
#[derive(Clone)]
pub struct Function(Arc<FunctionCell>);

impl Function {
    /// Create a named host-realm function
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&[Value]) -> MembraneResult<Vec<Value>> + Send + Sync + 'static,
    {
        Self::with_realm(Realm::Host, Some(Arc::from(name)), body)
    }

    /// Create an unnamed host-realm function
    pub fn anonymous<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> MembraneResult<Vec<Value>> + Send + Sync + 'static,
    {
        Self::with_realm(Realm::Host, None, body)
    }

    pub fn with_realm<F>(realm: Realm, name: Option<Arc<str>>, body: F) -> Self
    where
        F: Fn(&[Value]) -> MembraneResult<Vec<Value>> + Send + Sync + 'static,
    {
        Self(Arc::new(FunctionCell {
            realm,
            name,
            body: Box::new(body),
        }))
    }

    pub fn realm(&self) -> Realm {
        self.0.realm
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub(crate) fn name_arc(&self) -> Option<Arc<str>> {
        self.0.name.clone()
    }

    pub fn id(&self) -> ValueId {
        ValueId::of(&self.0)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Invoke the function body directly, bypassing any boundary policy
    pub fn invoke(&self, args: &[Value]) -> MembraneResult<Vec<Value>> {
        (self.0.body)(args)
    }

    pub(crate) fn downgrade(&self) -> Weak<FunctionCell> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn from_cell(cell: Arc<FunctionCell>) -> Self {
        Self(cell)
    }
}
