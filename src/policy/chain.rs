/*!
 * Policy Chain
 * Evaluates a boundary access through multiple policies
 */

use super::decision::PolicyDecision;
use super::traits::Policy;
use crate::value::Value;
use log::debug;
use std::sync::Arc;

/// Ordered list of policies; the first non-`Allow` decision wins
#[derive(Clone, Default)]
pub struct PolicyChain {
    policies: Vec<Arc<dyn Policy>>,
}

impl PolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy
    pub fn add_policy(&mut self, policy: impl Policy + 'static) {
        self.policies.push(Arc::new(policy));
    }

    /// Builder form of `add_policy`
    pub fn with(mut self, policy: impl Policy + 'static) -> Self {
        self.add_policy(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn first_decisive(&self, decide: impl Fn(&dyn Policy) -> PolicyDecision) -> PolicyDecision {
        for policy in &self.policies {
            match decide(policy.as_ref()) {
                PolicyDecision::Allow => continue,
                decision => {
                    debug!("Policy '{}' decided {:?}", policy.name(), decision);
                    return decision;
                }
            }
        }
        PolicyDecision::Allow
    }
}

impl Policy for PolicyChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn check_read(&self, object: &Value, key: &Value) -> PolicyDecision {
        self.first_decisive(|p| p.check_read(object, key))
    }

    fn check_write(&self, object: &Value, key: &Value, value: &Value) -> PolicyDecision {
        self.first_decisive(|p| p.check_write(object, key, value))
    }

    fn check_call(&self, callee: &Value, args: &[Value]) -> PolicyDecision {
        self.first_decisive(|p| p.check_call(callee, args))
    }

    fn filter_members(&self, object: &Value, keys: &mut Vec<Value>) {
        for policy in &self.policies {
            policy.filter_members(object, keys);
        }
    }
}
