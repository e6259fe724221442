/*!
 * Membrane Library
 * Object-capability boundary between host values and untrusted guest code
 *
 * Host objects never cross into the sandbox directly. They are replaced by
 * proxies whose every read, write, call and enumeration goes through an
 * embedder-supplied policy, and whose identity stays stable for as long as
 * both sides are alive.
 */

pub mod core;
pub mod monitoring;
pub mod policy;
pub mod registry;
pub mod sandbox;
pub mod value;

// Re-exports
pub use crate::core::errors::{MembraneError, MembraneResult};
pub use crate::core::id::{SandboxId, ValueId};
pub use monitoring::init_tracing;
pub use policy::{
    AuditLogger, MemberBlocklist, Operation, Policy, PolicyChain, PolicyDecision, PolicyHooks,
};
pub use registry::{IdentityRegistry, Registration, RegistryStats};
pub use sandbox::{
    HandleRetention, ProxyHandle, ProxyState, Sandbox, SandboxBuilder, SandboxConfig,
};
pub use value::{Function, HostObject, Object, Realm, Table, Value};
