//! Anchor symbol lookup for offset-mode attachment
//!
//! Translates a symbol to a file offset the same way aya does when it is
//! given `Some(symbol)`: for executables and shared objects the symbol's
//! virtual address is rebased through its containing section
//! (`addr - section.addr + section.file_offset`).
//!
//! Stripping removes `.symtab`, so names like `_start` or `main` are usually
//! gone from the very binaries offset mode is meant for. `.dynsym` survives,
//! which is where [`resolve_anchor`] looks when the requested name is missing.

use std::fs;
use std::path::Path;

use log::{info, warn};
use object::{Object, ObjectKind, ObjectSection, ObjectSymbol, SymbolKind};

use crate::domain::ResolutionError;

/// Symbol handed to the attachment primitive and where it lies on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub symbol: String,
    pub file_offset: u64,
}

/// File offset of `symbol` in the binary at `path`.
///
/// `.symtab` is searched before `.dynsym`; undefined symbols are skipped.
///
/// # Errors
/// Returns [`ResolutionError::AnchorNotFound`] if no defined symbol of that
/// name exists or it has no file-backed section, and the usual read/parse
/// errors otherwise.
pub fn resolve_symbol_file_offset(path: &Path, symbol: &str) -> Result<u64, ResolutionError> {
    let data = read(path)?;
    let obj = parse(path, &data)?;
    find_symbol(&obj, symbol).ok_or_else(|| not_found(path, symbol))
}

/// Anchor for probes at or after `not_after`, preferring `symbol`.
///
/// When `symbol` is not defined in the binary, the exported function in
/// `.dynsym` closest before `not_after` is used instead, so the primitive
/// offset stays small and non-negative.
///
/// # Errors
/// Returns [`ResolutionError::AnchorNotFound`] when neither the requested
/// symbol nor any preceding `.dynsym` function exists.
pub fn resolve_anchor(path: &Path, symbol: &str, not_after: u64) -> Result<Anchor, ResolutionError> {
    let data = read(path)?;
    let obj = parse(path, &data)?;

    if let Some(file_offset) = find_symbol(&obj, symbol) {
        return Ok(Anchor { symbol: symbol.to_string(), file_offset });
    }

    let fallback = obj
        .dynamic_symbols()
        .filter(|s| !s.is_undefined() && s.kind() == SymbolKind::Text)
        .filter_map(|s| {
            let name = s.name().ok().filter(|name| !name.is_empty())?;
            let file_offset = symbol_file_offset(&obj, &s)?;
            (file_offset <= not_after).then(|| Anchor { symbol: name.to_string(), file_offset })
        })
        .max_by_key(|anchor| anchor.file_offset);

    match fallback {
        Some(anchor) => {
            warn!(
                "Anchor symbol {symbol:?} not found in {} (stripped?), using exported function {} at 0x{:x}",
                path.display(),
                anchor.symbol,
                anchor.file_offset
            );
            Ok(anchor)
        }
        None => {
            info!("{} exports no function before file offset 0x{not_after:x}", path.display());
            Err(not_found(path, symbol))
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ResolutionError> {
    fs::read(path).map_err(|source| ResolutionError::Unreadable { path: path.to_path_buf(), source })
}

fn parse<'data>(path: &Path, data: &'data [u8]) -> Result<object::File<'data>, ResolutionError> {
    object::File::parse(data).map_err(|e| ResolutionError::Unparseable {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn not_found(path: &Path, symbol: &str) -> ResolutionError {
    ResolutionError::AnchorNotFound { symbol: symbol.to_string(), path: path.to_path_buf() }
}

fn find_symbol(obj: &object::File<'_>, symbol: &str) -> Option<u64> {
    let sym = obj
        .symbols()
        .chain(obj.dynamic_symbols())
        .find(|s| !s.is_undefined() && s.name().is_ok_and(|name| name == symbol))?;
    symbol_file_offset(obj, &sym)
}

fn symbol_file_offset<'data, S: ObjectSymbol<'data>>(obj: &object::File<'data>, sym: &S) -> Option<u64> {
    if !matches!(obj.kind(), ObjectKind::Executable | ObjectKind::Dynamic) {
        return Some(sym.address());
    }

    let section = obj.section_by_index(sym.section_index()?).ok()?;
    let (section_offset, _) = section.file_range()?;
    sym.address().checked_sub(section.address())?.checked_add(section_offset)
}
