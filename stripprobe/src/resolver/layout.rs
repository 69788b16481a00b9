//! ELF program/section header view of a target binary
//!
//! Only the headers are read. Segment and section payloads are never touched,
//! so a binary whose section headers were stripped (or mangled) still yields
//! its program headers.

use std::fmt;
use std::fs;
use std::path::Path;

use log::warn;
use object::elf::{
    FileHeader32, FileHeader64, PF_R, PF_W, PF_X, PT_DYNAMIC, PT_GNU_EH_FRAME, PT_GNU_PROPERTY,
    PT_GNU_RELRO, PT_GNU_STACK, PT_INTERP, PT_LOAD, PT_NOTE, PT_NULL, PT_PHDR, PT_TLS,
};
use object::read::elf::{FileHeader, ProgramHeader, SectionHeader};
use object::{Endianness, FileKind};

use crate::domain::ResolutionError;

/// Name of the section whose file offset marks where code bytes begin
pub const CODE_SECTION: &[u8] = b".text";

/// One entry of the program header table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSegment {
    pub p_type: u32,
    pub flags: u32,
    pub file_offset: u64,
    pub virtual_address: u64,
    pub file_size: u64,
}

impl ProgramSegment {
    #[must_use]
    pub fn is_loadable(&self) -> bool {
        self.p_type == PT_LOAD
    }

    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.flags & PF_X != 0
    }

    #[must_use]
    pub fn contains_file_offset(&self, offset: u64) -> bool {
        offset >= self.file_offset && offset - self.file_offset < self.file_size
    }
}

impl fmt::Display for ProgramSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let perm = |bit: u32, c: char| if self.flags & bit != 0 { c } else { '-' };
        write!(
            f,
            "Type={} Flags={}{}{} Off=0x{:x} Vaddr=0x{:x} FileSz=0x{:x}",
            segment_type_name(self.p_type),
            perm(PF_R, 'R'),
            perm(PF_W, 'W'),
            perm(PF_X, 'X'),
            self.file_offset,
            self.virtual_address,
            self.file_size,
        )
    }
}

fn segment_type_name(p_type: u32) -> String {
    let name = match p_type {
        PT_NULL => "PT_NULL",
        PT_LOAD => "PT_LOAD",
        PT_DYNAMIC => "PT_DYNAMIC",
        PT_INTERP => "PT_INTERP",
        PT_NOTE => "PT_NOTE",
        PT_PHDR => "PT_PHDR",
        PT_TLS => "PT_TLS",
        PT_GNU_EH_FRAME => "PT_GNU_EH_FRAME",
        PT_GNU_STACK => "PT_GNU_STACK",
        PT_GNU_RELRO => "PT_GNU_RELRO",
        PT_GNU_PROPERTY => "PT_GNU_PROPERTY",
        other => return format!("0x{other:x}"),
    };
    name.to_string()
}

/// The named code section, when the section header table survived stripping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSection {
    pub file_offset: u64,
    pub address: u64,
}

/// Where a base offset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSource {
    CodeSection,
    /// Index into [`BinaryLayout::segments`]
    ExecutableSegment(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseOffset {
    pub offset: u64,
    pub source: BaseSource,
}

/// Program segments in on-disk order plus the optional code section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryLayout {
    pub segments: Vec<ProgramSegment>,
    pub code_section: Option<CodeSection>,
}

impl BinaryLayout {
    /// Read and parse the headers of the binary at `path`.
    ///
    /// The file contents are dropped before returning.
    ///
    /// # Errors
    /// Returns a [`ResolutionError`] if the file cannot be read, is not ELF,
    /// or its file/program headers are malformed.
    pub fn read(path: &Path) -> Result<Self, ResolutionError> {
        let data = fs::read(path)
            .map_err(|source| ResolutionError::Unreadable { path: path.to_path_buf(), source })?;
        Self::parse(path, &data)
    }

    /// Parse headers from an in-memory image. `path` is only used in errors.
    ///
    /// # Errors
    /// Same as [`BinaryLayout::read`], minus the I/O failure.
    pub fn parse(path: &Path, data: &[u8]) -> Result<Self, ResolutionError> {
        let parsed = match FileKind::parse(data) {
            Ok(FileKind::Elf32) => parse_elf::<FileHeader32<Endianness>>(data),
            Ok(FileKind::Elf64) => parse_elf::<FileHeader64<Endianness>>(data),
            _ => return Err(ResolutionError::NotElf { path: path.to_path_buf() }),
        };
        parsed.map_err(|e| ResolutionError::Unparseable {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Pick the code-region base offset.
    ///
    /// A `.text` section with a non-zero file offset wins. Otherwise the first
    /// loadable, executable segment in on-disk order is used.
    #[must_use]
    pub fn select_base(&self) -> Option<BaseOffset> {
        if let Some(section) = self.code_section.filter(|s| s.file_offset != 0) {
            return Some(BaseOffset { offset: section.file_offset, source: BaseSource::CodeSection });
        }
        self.segments
            .iter()
            .position(|s| s.is_loadable() && s.is_executable())
            .map(|index| BaseOffset {
                offset: self.segments[index].file_offset,
                source: BaseSource::ExecutableSegment(index),
            })
    }

    /// Loadable, executable segment whose file range holds `offset`, if any
    #[must_use]
    pub fn executable_segment_at(&self, offset: u64) -> Option<&ProgramSegment> {
        self.segments
            .iter()
            .find(|s| s.is_loadable() && s.is_executable() && s.contains_file_offset(offset))
    }
}

fn parse_elf<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> object::read::Result<BinaryLayout> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;

    let segments = header
        .program_headers(endian, data)?
        .iter()
        .map(|ph| ProgramSegment {
            p_type: ph.p_type(endian),
            flags: ph.p_flags(endian),
            file_offset: ph.p_offset(endian).into(),
            virtual_address: ph.p_vaddr(endian).into(),
            file_size: ph.p_filesz(endian).into(),
        })
        .collect();

    // A broken section header table only costs us the preferred source; the
    // segment fallback still applies.
    let code_section = match header.sections(endian, data) {
        Ok(sections) => sections.section_by_name(endian, CODE_SECTION).map(|(_, section)| {
            CodeSection {
                file_offset: section.sh_offset(endian).into(),
                address: section.sh_addr(endian).into(),
            }
        }),
        Err(e) => {
            warn!("Ignoring unreadable section headers: {e}");
            None
        }
    };

    Ok(BinaryLayout { segments, code_section })
}
