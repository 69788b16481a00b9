//! # Shared Names (eBPF ↔ Userspace)
//!
//! Program names, map names and counter slots that both the kernel-side
//! instrumentation unit and the userspace loader must agree on. Nothing here
//! crosses the boundary as data; these are the keys each side uses to find
//! the other's objects.
//!
//! ## Probe Roles
//!
//! | slot | program                | kind      |
//! |------|------------------------|-----------|
//! | 0    | `uprobe_read_entry`    | uprobe    |
//! | 1    | `uprobe_write_entry`   | uprobe    |
//! | 2    | `uretprobe_write_exit` | uretprobe |

#![no_std]

// ============================================================================
// Program Names
// ============================================================================

/// Entry probe on the read routine
pub const READ_ENTRY_PROGRAM: &str = "uprobe_read_entry";

/// Entry probe on the write routine
pub const WRITE_ENTRY_PROGRAM: &str = "uprobe_write_entry";

/// Return probe on the write routine
///
/// Bound at the same file offset as [`WRITE_ENTRY_PROGRAM`]; the kernel fires
/// it when the function returns instead of when it is called.
pub const WRITE_EXIT_PROGRAM: &str = "uretprobe_write_exit";

// ============================================================================
// Hit Counters
// ============================================================================

/// Per-CPU array with one `u64` hit counter per probe role
pub const PROBE_HITS_MAP: &str = "PROBE_HITS";

pub const READ_ENTRY_SLOT: u32 = 0;
pub const WRITE_ENTRY_SLOT: u32 = 1;
pub const WRITE_EXIT_SLOT: u32 = 2;

/// Number of slots in [`PROBE_HITS_MAP`]
pub const PROBE_SLOTS: u32 = 3;
