/*!
 * Policy Traits
 * Interface consulted by the interceptor for every boundary access
 */

use super::decision::PolicyDecision;
use crate::value::Value;

/// Policy that decides boundary accesses
///
/// Every argument is a raw host value. Implementations may be invoked more
/// than once for the same logical access and must tolerate that.
pub trait Policy: Send + Sync {
    /// Policy name
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Decide a property read on `object`
    fn check_read(&self, _object: &Value, _key: &Value) -> PolicyDecision {
        PolicyDecision::Allow
    }

    /// Decide an assignment of `value` to `key` on `object`
    fn check_write(&self, _object: &Value, _key: &Value, _value: &Value) -> PolicyDecision {
        PolicyDecision::Allow
    }

    /// Decide an invocation of `callee`
    fn check_call(&self, _callee: &Value, _args: &[Value]) -> PolicyDecision {
        PolicyDecision::Allow
    }

    /// Remove member keys of `object` that must not be enumerated
    fn filter_members(&self, _object: &Value, _keys: &mut Vec<Value>) {}
}
