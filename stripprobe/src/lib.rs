//! # stripprobe - uprobes on stripped binaries by relative offset
//!
//! stripprobe binds eBPF uprobes to the read and write routines of a binary
//! whose symbol table has been stripped, so the plaintext those routines
//! handle (typically just before encryption / just after decryption) becomes
//! visible in the kernel trace ring.
//!
//! Symbols are gone, so the operator supplies each routine's offset measured
//! in an unstripped reference build. stripprobe rebases those offsets onto
//! the target's code region and manages the probes' lifetime.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Target Process (stripped binary)               │
//! │             read routine ─────────── write routine              │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ uprobe / uretprobe hits
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                eBPF Programs (Kernel, stripprobe-ebpf)          │
//! │  • uprobe_read_entry       • uprobe_write_entry                 │
//! │  • uretprobe_write_exit                                         │
//! └───────────────┬───────────────────────────────┬─────────────────┘
//!                 │ bpf_printk                     │ PROBE_HITS
//!                 ▼                                ▼
//!        /sys/kernel/debug/tracing/trace_pipe    hit summary on exit
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   stripprobe (This Crate)                       │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Resolver   │──▶│  ProbePlan   │──▶│   Session    │         │
//! │  │ (ELF headers)│   │ (abs. offs.) │   │ (attach/     │         │
//! │  └──────────────┘   └──────────────┘   │  teardown)   │         │
//! │                                        └──────┬───────┘         │
//! │                                               ▼                 │
//! │                                        ProbeBackend (aya)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`resolver`]: base offset of the target's code region (`.text`, else the
//!   first executable `PT_LOAD`), and anchor symbol lookup
//! - [`probing`]: probe plan, attachment strategies, the backend trait and
//!   its aya implementation, the session lifecycle
//! - [`preflight`]: privilege / kernel / binary checks before loading eBPF
//! - [`cli`]: command-line arguments
//! - [`domain`]: offset newtypes, probe roles and error types
//!
//! ## Typical Usage
//!
//! ```bash
//! # Offsets of SSL_read / SSL_write relative to .text in the reference build
//! sudo ./stripprobe ./client 0x20 0x340
//! sudo cat /sys/kernel/debug/tracing/trace_pipe
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! load unit → open target → read-entry → write-entry → write-exit
//!                         (wait for SIGINT / SIGTERM)
//! write-exit → write-entry → read-entry → close target → close unit
//! ```
//!
//! A failure at any acquisition step releases everything acquired before it,
//! in the same reverse order.

pub mod cli;
pub mod domain;
pub mod preflight;
pub mod probing;
pub mod resolver;
