//! # Offset Resolution
//!
//! Turns a *relative* offset, measured from the start of the code region of
//! an unstripped reference build, into the *absolute* file offset a uprobe
//! must be bound at in the (stripped) target.
//!
//! ## Why a base offset is needed
//!
//! Offsets read off the reference build with `nm`/`objdump` are distances
//! from the start of its code. Stripping does not move code relative to
//! itself, but the code region may start at a different file offset in the
//! stripped build, so the distance has to be re-anchored:
//!
//! ```text
//! absolute = base(target) + relative
//! ```
//!
//! ## Base offset sources, in priority order
//!
//! 1. `.text` section file offset, when present and non-zero. Strip removes
//!    `.symtab` but usually keeps section headers, and the section offset is
//!    exactly where code bytes begin.
//! 2. File offset of the first `PT_LOAD` segment with `PF_X`, for binaries
//!    whose section headers were removed too.
//!
//! Program headers are always logged, whichever source wins.
//!
//! ## Example
//!
//! ```text
//! .text at file offset 0x1000
//! read  relative 0x20   → attach at 0x1020
//! write relative 0x340  → attach at 0x1340 (entry and return probe)
//! ```

pub mod layout;
pub mod symbol;

use std::path::Path;

use log::info;

use crate::domain::ResolutionError;

pub use layout::{BaseOffset, BaseSource, BinaryLayout, CodeSection, ProgramSegment};
pub use symbol::{resolve_anchor, resolve_symbol_file_offset, Anchor};

/// Headers of a target binary together with its chosen base offset
#[derive(Debug, Clone)]
pub struct ResolvedBinary {
    pub layout: BinaryLayout,
    pub base: BaseOffset,
}

/// Parse the target's headers, log its program segments and pick the base
/// offset.
///
/// # Errors
/// Returns [`ResolutionError::NoExecutableRegion`] when neither source yields
/// a candidate, or a read/parse error.
pub fn inspect_binary(path: &Path) -> Result<ResolvedBinary, ResolutionError> {
    let layout = BinaryLayout::read(path)?;

    info!("Inspecting program headers of {}:", path.display());
    for segment in &layout.segments {
        info!("  {segment}");
    }

    let base = layout
        .select_base()
        .ok_or_else(|| ResolutionError::NoExecutableRegion { path: path.to_path_buf() })?;

    match base.source {
        BaseSource::CodeSection => {
            if let Some(section) = layout.code_section {
                info!(
                    "Using .text section offset: Off=0x{:x}, Addr=0x{:x}",
                    section.file_offset, section.address
                );
            }
        }
        BaseSource::ExecutableSegment(index) => {
            let segment = &layout.segments[index];
            info!(
                "Selected PT_LOAD exec segment: Off=0x{:x}, Vaddr=0x{:x}",
                segment.file_offset, segment.virtual_address
            );
        }
    }

    Ok(ResolvedBinary { layout, base })
}

/// File offset where the target's code region begins
///
/// # Errors
/// See [`inspect_binary`].
pub fn resolve_base_offset(path: &Path) -> Result<u64, ResolutionError> {
    inspect_binary(path).map(|resolved| resolved.base.offset)
}
