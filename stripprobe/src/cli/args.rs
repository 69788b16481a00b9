//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::probing::{AttachStrategy, DEFAULT_ANCHOR};

#[derive(Parser)]
#[command(
    name = "stripprobe",
    about = "Attach read/write uprobes to a stripped binary by relative offset",
    after_help = "\
OFFSETS:
    Relative offsets are measured from the start of .text in an unstripped
    build of the same binary, e.g. `nm ref | grep SSL_read` minus the .text
    address from `readelf -S ref`. Hex, with or without 0x.

EXAMPLES:
    sudo stripprobe ./client 0x20 0x340               Attach, then read trace_pipe
    sudo stripprobe ./client 20 340 --pid 4242        Only fire for one process
    stripprobe ./client 0x20 0x340 --resolve-only     Print offsets, attach nothing"
)]
pub struct Args {
    /// Stripped target executable
    #[arg(value_name = "BINARY")]
    pub target: PathBuf,

    /// Relative offset of the read routine (hex)
    #[arg(value_name = "READ_OFFSET")]
    pub read_offset: String,

    /// Relative offset of the write routine (hex)
    #[arg(value_name = "WRITE_OFFSET")]
    pub write_offset: String,

    /// How probe locations are passed to the kernel
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
    pub strategy: StrategyArg,

    /// Anchor symbol for offset mode
    #[arg(long, value_name = "SYMBOL", default_value = DEFAULT_ANCHOR)]
    pub anchor: String,

    /// Only fire probes for this process
    #[arg(short, long)]
    pub pid: Option<i32>,

    /// Instrumentation unit (eBPF object) to load
    #[arg(long, value_name = "FILE")]
    pub program: Option<PathBuf>,

    /// Resolve and print the attach offsets, then exit
    #[arg(long)]
    pub resolve_only: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Address mode if the kernel primitive accepts raw offsets, else offset mode
    Auto,
    /// Absolute file offset, no symbol
    Address,
    /// Anchor symbol plus relative offset
    Offset,
}

impl Args {
    #[must_use]
    pub fn attach_strategy(&self) -> AttachStrategy {
        match self.strategy {
            StrategyArg::Auto => AttachStrategy::Auto { anchor: self.anchor.clone() },
            StrategyArg::Address => AttachStrategy::Address,
            StrategyArg::Offset => AttachStrategy::Offset { anchor: self.anchor.clone() },
        }
    }
}
