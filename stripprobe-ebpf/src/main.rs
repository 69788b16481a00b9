//! # eBPF Kernel-Side Instrumentation Unit
//!
//! Three probe programs bound by userspace to file offsets inside a stripped
//! target binary. None of them inspect buffers; each one writes a line to the
//! kernel trace ring (`/sys/kernel/debug/tracing/trace_pipe`) and counts its
//! own hits.
//!
//! ## Programs
//!
//! - **Uprobe**: `uprobe_read_entry` - read routine called
//! - **Uprobe**: `uprobe_write_entry` - write routine called
//! - **Uretprobe**: `uretprobe_write_exit` - write routine returned
//!
//! ## Maps (Shared with Userspace)
//!
//! - `PROBE_HITS` - Per-CPU hit counter per probe role
//!
//! ## Build
//!
//! Always compiled in release mode:
//! ```bash
//! cargo xtask build-ebpf
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    bpf_printk,
    helpers::bpf_get_current_pid_tgid,
    macros::{map, uprobe, uretprobe},
    maps::PerCpuArray,
    programs::{ProbeContext, RetProbeContext},
};
use stripprobe_common::{PROBE_SLOTS, READ_ENTRY_SLOT, WRITE_ENTRY_SLOT, WRITE_EXIT_SLOT};

// ============================================================================
// eBPF Maps
// ============================================================================

/// Hit counters indexed by probe slot (see `stripprobe_common`)
///
/// Per-CPU so the hot path needs no atomics; userspace sums across CPUs.
#[map]
static PROBE_HITS: PerCpuArray<u64> = PerCpuArray::with_max_entries(PROBE_SLOTS, 0);

fn count_hit(slot: u32) {
    if let Some(counter) = PROBE_HITS.get_ptr_mut(slot) {
        unsafe { *counter += 1 };
    }
}

fn current_tgid() -> u32 {
    (unsafe { bpf_get_current_pid_tgid() } >> 32) as u32
}

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: read routine entry
#[uprobe]
pub fn uprobe_read_entry(_ctx: ProbeContext) -> u32 {
    count_hit(READ_ENTRY_SLOT);
    unsafe { bpf_printk!(b"stripprobe: read entered (pid %u)", current_tgid()) };
    0
}

/// Hook: write routine entry
#[uprobe]
pub fn uprobe_write_entry(_ctx: ProbeContext) -> u32 {
    count_hit(WRITE_ENTRY_SLOT);
    unsafe { bpf_printk!(b"stripprobe: write entered (pid %u)", current_tgid()) };
    0
}

/// Hook: write routine return
///
/// Bound at the same offset as `uprobe_write_entry`; the return value is the
/// write routine's result.
#[uretprobe]
pub fn uretprobe_write_exit(ctx: RetProbeContext) -> u32 {
    count_hit(WRITE_EXIT_SLOT);
    let ret: i64 = ctx.ret().unwrap_or(-1);
    unsafe { bpf_printk!(b"stripprobe: write returned %ld (pid %u)", ret, current_tgid()) };
    0
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
