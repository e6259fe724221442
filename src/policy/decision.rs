/*!
 * Policy Decision
 * Outcome of a single hook invocation
 */

use crate::core::errors::POLICY_TIMEOUT_REASON;
use crate::value::Value;

/// Policy decision
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PolicyDecision {
    /// Proceed with the access as requested
    #[default]
    Allow,
    /// Reject the access
    Deny(String),
    /// Proceed, using this raw value instead of the real one
    Substitute(Value),
    /// The embedder bounded the hook and the bound expired; treated as a denial
    TimedOut,
}

impl PolicyDecision {
    pub fn deny(reason: impl Into<String>) -> Self {
        PolicyDecision::Deny(reason.into())
    }

    pub fn substitute(value: impl Into<Value>) -> Self {
        PolicyDecision::Substitute(value.into())
    }

    /// True for `Allow` and `Substitute`
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow | PolicyDecision::Substitute(_))
    }

    /// Reason reported to the caller when the decision rejects the access
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            PolicyDecision::Deny(reason) => Some(reason),
            PolicyDecision::TimedOut => Some(POLICY_TIMEOUT_REASON),
            _ => None,
        }
    }
}
