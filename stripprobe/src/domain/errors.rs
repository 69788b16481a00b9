//! Structured error types for stripprobe
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Every class is fatal: nothing here is retried.

use std::path::PathBuf;

use thiserror::Error;

use super::types::ProbeRole;

/// Malformed invocation
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Invalid hex offset {input:?}: no digits after the 0x prefix")]
    EmptyHex { input: String },

    #[error("Invalid hex offset {input:?}: expected hexadecimal digits")]
    MalformedHex { input: String },

    #[error("Invalid hex offset {input:?}: does not fit in 64 bits")]
    HexOverflow { input: String },
}

/// The target binary cannot yield a code-region base offset
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Failed to read binary {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not an ELF file", path.display())]
    NotElf { path: PathBuf },

    #[error("Failed to parse ELF headers of {}: {error}", path.display())]
    Unparseable { path: PathBuf, error: String },

    #[error("No executable segment or .text section found in {}", path.display())]
    NoExecutableRegion { path: PathBuf },

    #[error(
        "Anchor symbol {symbol:?} not found in {} and no exported function precedes the probes; \
         pass --anchor with a symbol listed by `nm -D`, or use --strategy address",
        path.display()
    )]
    AnchorNotFound { symbol: String, path: PathBuf },

    #[error("File offset 0x{target:x} lies before anchor symbol {symbol:?} at 0x{anchor:x}")]
    AnchorAfterTarget { symbol: String, anchor: u64, target: u64 },
}

/// The environment could not carry the instrumentation
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("Failed to load instrumentation unit: {0}")]
    UnitLoadFailed(String),

    #[error("Program {0} not found in instrumentation unit")]
    ProgramNotFound(String),

    #[error("Failed to open executable {binary}: {error}")]
    OpenExecutableFailed { binary: String, error: String },

    #[error("Failed to attach {probe} probe to {binary} at file offset 0x{offset:x}: {error}")]
    ProbeAttachFailed { probe: ProbeRole, binary: String, offset: u64, error: String },

    #[error("Failed to release {resource}: {error}")]
    ReleaseFailed { resource: String, error: String },
}

/// Top-level error for the library API
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Attach(#[from] AttachError),
}

pub type Result<T> = std::result::Result<T, Error>;
