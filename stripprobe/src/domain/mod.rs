//! Domain model for stripprobe
//!
//! This module contains core domain types and errors that provide:
//! - Distinct types for relative and absolute file offsets
//! - The fixed set of probe roles
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{AbsoluteFileOffset, ProbeKind, ProbeRole, RelativeOffset};

pub use errors::{AttachError, Error, InputError, ResolutionError, Result};
