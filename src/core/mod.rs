/*!
 * Core Module
 * Strategy kinds, limits and error handling shared by the harness
 */

pub mod errors;
pub mod limits;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use types::*;
