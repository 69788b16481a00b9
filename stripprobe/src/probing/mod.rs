//! Probe orchestration
//!
//! - `plan`: absolute offsets per probe role
//! - `strategy`: address vs. anchor-plus-offset attachment
//! - `backend`: the attachment primitive trait
//! - `session`: acquisition and reverse-order release
//! - `aya_backend`: the aya implementation of the primitive
//! - `diagnostics`: per-probe hit counters
//! - `shutdown`: SIGINT/SIGTERM wait

pub mod aya_backend;
pub mod backend;
pub mod diagnostics;
pub mod plan;
pub mod session;
pub mod shutdown;
pub mod strategy;

// Re-export common types
pub use aya_backend::{AyaBackend, DEFAULT_UNIT_PATH};
pub use backend::ProbeBackend;
pub use diagnostics::{print_probe_hits, probe_hit_counts};
pub use plan::{ProbePlan, RequestedOffsets};
pub use session::{Session, TeardownReport};
pub use shutdown::{ShutdownSignals, Termination};
pub use strategy::{AttachLocation, AttachStrategy, ProbeSpec, DEFAULT_ANCHOR};
