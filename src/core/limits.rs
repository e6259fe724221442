/*!
 * Boundary Limits and Constants
 *
 * Centralized location for sandbox-wide limits and defaults.
 * Performance-critical constants are marked with [PERF]
 * Security-critical constants are marked with [SECURITY]
 */

// =============================================================================
// CONVERSION LIMITS
// =============================================================================

/// Maximum container nesting depth followed by a single wrap/unwrap call
/// [SECURITY] Bounds recursion so hostile host graphs cannot overflow the stack
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Depth used by the strict profile
pub const STRICT_MAX_DEPTH: usize = 32;

/// Depth used by the permissive profile
pub const PERMISSIVE_MAX_DEPTH: usize = 1024;

// =============================================================================
// IDENTITY REGISTRY
// =============================================================================

/// Registrations between automatic reclamation sweeps
/// [PERF] Amortizes the O(n) sweep across registrations
pub const DEFAULT_SWEEP_INTERVAL: u64 = 1024;

/// Initial capacity of each registry index
pub const REGISTRY_INITIAL_CAPACITY: usize = 256;

// =============================================================================
// AUDIT
// =============================================================================

/// Boundary decisions kept in the audit ring buffer
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

/// Audit capacity of the strict profile
pub const STRICT_AUDIT_CAPACITY: usize = 10_000;

// =============================================================================
// MONITORING
// =============================================================================

/// Host calls slower than this are logged as warnings
pub const SLOW_HOST_CALL_MS: u128 = 50;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides `SandboxConfig::max_depth`
pub const ENV_MAX_DEPTH: &str = "MEMBRANE_MAX_DEPTH";

/// Overrides `SandboxConfig::sweep_interval`
pub const ENV_SWEEP_INTERVAL: &str = "MEMBRANE_SWEEP_INTERVAL";

/// Enables the audit trail when set to `1` or `true`
pub const ENV_AUDIT: &str = "MEMBRANE_AUDIT";

/// Switches tracing output to JSON when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "MEMBRANE_TRACE_JSON";
