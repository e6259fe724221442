/*!
 * Policy Module
 * Embedder-supplied decisions for reads, writes, calls and enumeration
 *
 * ## Features
 * - Four optional hooks, missing hooks allow
 * - Hooks only ever see raw host values
 * - Composable policies through `PolicyChain`
 * - Bounded audit trail of boundary decisions
 *
 * ## Usage
 * ```ignore
 * use membrane::policy::{PolicyDecision, PolicyHooks};
 *
 * let hooks = PolicyHooks::new().on_write(|_object, key, _value| {
 *     if key.as_str() == Some("Destroy") {
 *         PolicyDecision::deny("destroy is not available")
 *     } else {
 *         PolicyDecision::Allow
 *     }
 * });
 * let sandbox = Sandbox::new(hooks);
 * ```
 */

pub mod audit;
mod blocklist;
mod chain;
mod decision;
mod hooks;
mod traits;

// Re-export commonly used items
pub use audit::{AuditEvent, AuditLogger, AuditOutcome, AuditSeverity, AuditStats, Operation};
pub use blocklist::MemberBlocklist;
pub use chain::PolicyChain;
pub use decision::PolicyDecision;
pub use hooks::{CallHook, EnumerateHook, PolicyHooks, ReadHook, WriteHook};
pub use traits::Policy;
