//! Resolved attach offsets for one target
//!
//! Hex parsing is split from binary inspection so a malformed offset is
//! rejected before the target file is opened.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::domain::{AbsoluteFileOffset, InputError, ProbeRole, RelativeOffset, ResolutionError};
use crate::resolver::{inspect_binary, resolve_anchor};

use super::strategy::{AttachLocation, AttachStrategy, ProbeSpec};

/// Relative offsets of the read and write routines in the reference build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedOffsets {
    pub read: RelativeOffset,
    pub write: RelativeOffset,
}

impl RequestedOffsets {
    /// # Errors
    /// Returns the [`InputError`] of the first string that fails to parse.
    pub fn parse(read_hex: &str, write_hex: &str) -> Result<Self, InputError> {
        let read = RelativeOffset::parse_hex(read_hex)?;
        let write = RelativeOffset::parse_hex(write_hex)?;
        info!("Read relative offset:  {read} ({})", read.0);
        info!("Write relative offset: {write} ({})", write.0);
        Ok(Self { read, write })
    }
}

/// Absolute file offsets for every probe of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub target: PathBuf,
    pub base: u64,
    pub read: AbsoluteFileOffset,
    pub write: AbsoluteFileOffset,
}

impl ProbePlan {
    /// Inspect `target` and rebase both offsets onto its code region.
    ///
    /// Offsets that land outside every executable segment are reported but
    /// not rejected.
    ///
    /// # Errors
    /// Propagates the [`ResolutionError`] from inspecting the binary.
    pub fn resolve(target: &Path, offsets: RequestedOffsets) -> Result<Self, ResolutionError> {
        let resolved = inspect_binary(target)?;
        let base = resolved.base.offset;
        info!("Base file offset: 0x{base:x} ({base})");

        let plan = Self {
            target: target.to_path_buf(),
            base,
            read: AbsoluteFileOffset::from_base(base, offsets.read),
            write: AbsoluteFileOffset::from_base(base, offsets.write),
        };
        info!("Computed READ probe file offset:  {}", plan.read);
        info!("Computed WRITE probe file offset: {}", plan.write);

        for (name, offset) in [("read", plan.read), ("write", plan.write)] {
            if resolved.layout.executable_segment_at(offset.0).is_none() {
                warn!(
                    "{name} offset {offset} is outside every executable segment of {}; \
                     check the relative offset against the reference build",
                    target.display()
                );
            }
        }

        Ok(plan)
    }

    /// File offset a role is bound at. Both write probes share one offset.
    #[must_use]
    pub fn offset_for(&self, role: ProbeRole) -> AbsoluteFileOffset {
        match role {
            ProbeRole::ReadEntry => self.read,
            ProbeRole::WriteEntry | ProbeRole::WriteExit => self.write,
        }
    }

    /// One spec per role, in attachment order, located per `strategy`.
    ///
    /// `strategy` must already be settled; `Auto` is treated as address mode.
    ///
    /// # Errors
    /// In offset mode, fails if neither the anchor symbol nor an exported
    /// function before the probes can be resolved, or the anchor lies past a
    /// probe offset.
    pub fn probe_specs(&self, strategy: &AttachStrategy) -> Result<Vec<ProbeSpec>, ResolutionError> {
        let anchor = match strategy {
            AttachStrategy::Offset { anchor } => {
                let lowest = self.read.0.min(self.write.0);
                let anchor = resolve_anchor(&self.target, anchor, lowest)?;
                info!("Anchor symbol {} at file offset 0x{:x}", anchor.symbol, anchor.file_offset);
                Some(anchor)
            }
            AttachStrategy::Address | AttachStrategy::Auto { .. } => None,
        };

        ProbeRole::ALL
            .iter()
            .map(|&role| -> Result<ProbeSpec, ResolutionError> {
                let file_offset = self.offset_for(role).0;
                let location = match &anchor {
                    Some(anchor) => {
                        AttachLocation::anchored(&anchor.symbol, anchor.file_offset, file_offset)?
                    }
                    None => AttachLocation::Address { file_offset },
                };
                Ok(ProbeSpec { role, location })
            })
            .collect()
    }
}
