/*!
 * Core Module
 * Fundamental boundary types and error handling
 */

pub mod errors;
pub mod id;
pub mod limits;

// Re-export for convenience
pub use errors::*;
pub use id::{SandboxId, ValueId};
