/*!
 * Sandbox Module
 * The boundary between trusted host values and untrusted guest code
 *
 * ## Features
 * - Stable proxy identity per host reference
 * - Policy-checked read, write, call and enumerate
 * - Cycle-safe recursive conversion of containers
 * - Optional audit trail of every boundary decision
 *
 * ## Usage
 * ```ignore
 * use membrane::{PolicyHooks, Sandbox, Value};
 *
 * let sandbox = Sandbox::new(PolicyHooks::new());
 * let proxy = sandbox.wrap(&Value::from(workspace))?;
 * let name = sandbox.read(&proxy, &"Name".into())?;
 * ```
 */

mod config;
mod factory;
mod interceptor;

pub use config::{HandleRetention, SandboxConfig};
pub use interceptor::{ProxyCell, ProxyHandle, ProxyState};

use crate::core::id::SandboxId;
use crate::policy::{AuditEvent, AuditLogger, Operation, Policy, PolicyDecision, PolicyHooks};
use crate::registry::IdentityRegistry;
use crate::value::{Function, Realm, Table, Value};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Sandbox context
///
/// Cheap to clone; clones share the registry, policy and audit trail.
#[derive(Clone)]
pub struct Sandbox {
    inner: Arc<SandboxInner>,
}

struct SandboxInner {
    id: SandboxId,
    config: SandboxConfig,
    registry: IdentityRegistry,
    policy: Arc<dyn Policy>,
    audit: Option<AuditLogger>,
}

impl Sandbox {
    /// Sandbox governed by `hooks` with the default configuration
    pub fn new(hooks: PolicyHooks) -> Self {
        Self::builder().hooks(hooks).build()
    }

    pub fn with_policy(policy: impl Policy + 'static, config: SandboxConfig) -> Self {
        Self::builder().policy(policy).config(config).build()
    }

    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::default()
    }

    pub fn id(&self) -> SandboxId {
        self.inner.id
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.inner.registry
    }

    pub fn policy(&self) -> &dyn Policy {
        self.inner.policy.as_ref()
    }

    /// Audit trail, present when auditing is enabled
    pub fn audit(&self) -> Option<&AuditLogger> {
        self.inner.audit.as_ref()
    }

    /// Empty table owned by guest code
    pub fn new_table(&self) -> Table {
        Table::with_realm(Realm::Sandbox)
    }

    /// Function owned by guest code; calling it through the sandbox skips policy
    pub fn new_function<F>(&self, name: &str, body: F) -> Function
    where
        F: Fn(&[Value]) -> crate::core::errors::MembraneResult<Vec<Value>> + Send + Sync + 'static,
    {
        Function::with_realm(Realm::Sandbox, Some(Arc::from(name)), body)
    }

    /// Lifecycle state of the proxy standing in for `raw`
    pub fn proxy_state(&self, raw: &Value) -> Option<ProxyState> {
        self.inner.registry.state_of(raw)
    }

    pub(crate) fn record(
        &self,
        operation: Operation,
        target: &Value,
        key: Option<&Value>,
        decision: &PolicyDecision,
    ) {
        if let Some(audit) = &self.inner.audit {
            audit.log(AuditEvent::new(operation, target, key, decision));
        }
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.inner.id)
            .field("policy", &self.inner.policy.name())
            .field("registered", &self.inner.registry.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for [`Sandbox`]
#[derive(Default)]
pub struct SandboxBuilder {
    policy: Option<Arc<dyn Policy>>,
    config: SandboxConfig,
}

impl SandboxBuilder {
    pub fn hooks(self, hooks: PolicyHooks) -> Self {
        self.policy(hooks)
    }

    pub fn policy(mut self, policy: impl Policy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn shared_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn config(mut self, config: SandboxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Sandbox {
        let policy: Arc<dyn Policy> = match self.policy {
            Some(policy) => policy,
            None => Arc::new(PolicyHooks::allow_all()),
        };
        let audit = self
            .config
            .audit
            .then(|| AuditLogger::new(self.config.audit_capacity));
        let id = SandboxId::new();

        info!(
            sandbox = %id,
            policy = policy.name(),
            max_depth = self.config.max_depth,
            audit = self.config.audit,
            "Sandbox created"
        );

        Sandbox {
            inner: Arc::new(SandboxInner {
                id,
                registry: IdentityRegistry::with_sweep_interval(self.config.sweep_interval),
                config: self.config,
                policy,
                audit,
            }),
        }
    }
}
