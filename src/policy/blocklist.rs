/*!
 * Member Blocklist
 * Name-based convenience policy for embedders that think in member names
 */

use super::decision::PolicyDecision;
use super::traits::Policy;
use crate::value::Value;
use ahash::HashSet;

/// Denies access to named members, compared case-insensitively
///
/// Reads and writes are checked against the key, calls against the callee's
/// function name, and blocked names are dropped from enumeration.
#[derive(Debug, Clone, Default)]
pub struct MemberBlocklist {
    names: HashSet<String>,
}

impl MemberBlocklist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn block(&mut self, name: impl AsRef<str>) {
        self.names.insert(name.as_ref().to_ascii_lowercase());
    }

    pub fn is_blocked(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    fn key_blocked(&self, key: &Value) -> bool {
        key.as_str().is_some_and(|k| self.is_blocked(k))
    }

    fn deny(key: &Value) -> PolicyDecision {
        PolicyDecision::deny(format!("member '{}' is blocked", key))
    }
}

impl Policy for MemberBlocklist {
    fn name(&self) -> &str {
        "member_blocklist"
    }

    fn check_read(&self, _object: &Value, key: &Value) -> PolicyDecision {
        if self.key_blocked(key) {
            Self::deny(key)
        } else {
            PolicyDecision::Allow
        }
    }

    fn check_write(&self, _object: &Value, key: &Value, _value: &Value) -> PolicyDecision {
        if self.key_blocked(key) {
            Self::deny(key)
        } else {
            PolicyDecision::Allow
        }
    }

    fn check_call(&self, callee: &Value, _args: &[Value]) -> PolicyDecision {
        match callee.as_function().and_then(|f| f.name()) {
            Some(name) if self.is_blocked(name) => {
                PolicyDecision::deny(format!("call to '{}' is blocked", name))
            }
            _ => PolicyDecision::Allow,
        }
    }

    fn filter_members(&self, _object: &Value, keys: &mut Vec<Value>) {
        keys.retain(|k| !self.key_blocked(k));
    }
}
