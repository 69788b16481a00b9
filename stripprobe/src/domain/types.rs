//! Newtypes for offsets and probe roles
//!
//! Relative and absolute offsets are both plain `u64` on the wire; keeping
//! them as distinct types stops a relative offset from being handed to the
//! attachment primitive by mistake.

use std::fmt;

use log::warn;
use stripprobe_common::{
    READ_ENTRY_PROGRAM, READ_ENTRY_SLOT, WRITE_ENTRY_PROGRAM, WRITE_ENTRY_SLOT, WRITE_EXIT_PROGRAM,
    WRITE_EXIT_SLOT,
};

use super::errors::InputError;

/// Byte distance from the start of the reference build's code region to a
/// function of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativeOffset(pub u64);

impl RelativeOffset {
    /// Parse a hex string with an optional `0x`/`0X` prefix
    ///
    /// # Errors
    /// Returns [`InputError`] carrying the unmodified input when the digits are
    /// empty, not base-16, or do not fit in 64 bits.
    pub fn parse_hex(input: &str) -> Result<Self, InputError> {
        let lowered = input.to_ascii_lowercase();
        let digits = lowered.strip_prefix("0x").unwrap_or(&lowered);
        if digits.is_empty() {
            return Err(InputError::EmptyHex { input: input.to_string() });
        }
        // from_str_radix alone would accept a leading '+'
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InputError::MalformedHex { input: input.to_string() });
        }
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| InputError::HexOverflow { input: input.to_string() })
    }
}

impl fmt::Display for RelativeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// On-disk byte position handed to the attachment primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbsoluteFileOffset(pub u64);

impl AbsoluteFileOffset {
    /// `base + relative` with 64-bit wraparound.
    ///
    /// Wrapping is an accepted limitation: real binaries never come close to
    /// the 64-bit boundary. A wrapped sum is still logged so it cannot go
    /// unnoticed.
    #[must_use]
    pub fn from_base(base: u64, relative: RelativeOffset) -> Self {
        let (sum, wrapped) = base.overflowing_add(relative.0);
        if wrapped {
            warn!("Offset 0x{base:x} + {relative} wrapped past 2^64 to 0x{sum:x}");
        }
        Self(sum)
    }
}

impl fmt::Display for AbsoluteFileOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Whether a probe fires on call or on return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Entry,
    Exit,
}

/// The three probes every session attaches, in attachment order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeRole {
    ReadEntry,
    WriteEntry,
    WriteExit,
}

impl ProbeRole {
    /// Attachment order; teardown walks it backwards
    pub const ALL: [ProbeRole; 3] = [ProbeRole::ReadEntry, ProbeRole::WriteEntry, ProbeRole::WriteExit];

    #[must_use]
    pub fn kind(self) -> ProbeKind {
        match self {
            ProbeRole::ReadEntry | ProbeRole::WriteEntry => ProbeKind::Entry,
            ProbeRole::WriteExit => ProbeKind::Exit,
        }
    }

    /// Program name inside the instrumentation unit
    #[must_use]
    pub fn program_name(self) -> &'static str {
        match self {
            ProbeRole::ReadEntry => READ_ENTRY_PROGRAM,
            ProbeRole::WriteEntry => WRITE_ENTRY_PROGRAM,
            ProbeRole::WriteExit => WRITE_EXIT_PROGRAM,
        }
    }

    /// Slot in the `PROBE_HITS` counter map
    #[must_use]
    pub fn hit_slot(self) -> u32 {
        match self {
            ProbeRole::ReadEntry => READ_ENTRY_SLOT,
            ProbeRole::WriteEntry => WRITE_ENTRY_SLOT,
            ProbeRole::WriteExit => WRITE_EXIT_SLOT,
        }
    }
}

impl fmt::Display for ProbeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeRole::ReadEntry => "read-entry",
            ProbeRole::WriteEntry => "write-entry",
            ProbeRole::WriteExit => "write-exit",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_optional_and_case_insensitive() {
        for input in ["1a2b", "0x1a2b", "0X1a2b", "0x1A2B", "1A2B"] {
            assert_eq!(RelativeOffset::parse_hex(input).unwrap(), RelativeOffset(0x1a2b), "{input}");
        }
    }

    #[test]
    fn test_prefixed_and_bare_digits_agree() {
        for digits in ["0", "20", "340", "deadbeef", "ffffffffffffffff"] {
            let bare = RelativeOffset::parse_hex(digits).unwrap();
            let prefixed = RelativeOffset::parse_hex(&format!("0x{digits}")).unwrap();
            assert_eq!(bare, prefixed);
        }
    }

    #[test]
    fn test_empty_digits_rejected() {
        for input in ["", "0x", "0X"] {
            let err = RelativeOffset::parse_hex(input).unwrap_err();
            assert!(matches!(err, InputError::EmptyHex { .. }), "{input}: {err}");
        }
    }

    #[test]
    fn test_malformed_hex_keeps_original_input() {
        let err = RelativeOffset::parse_hex("0xZZzz").unwrap_err();
        assert!(matches!(err, InputError::MalformedHex { .. }));
        assert!(err.to_string().contains("0xZZzz"));
    }

    #[test]
    fn test_sign_and_separators_rejected() {
        for input in ["+1f", "-1f", "0x+1f", "1_000", " 1f", "0x0x1f"] {
            let err = RelativeOffset::parse_hex(input).unwrap_err();
            assert!(matches!(err, InputError::MalformedHex { .. }), "{input}: {err}");
        }
    }

    #[test]
    fn test_too_many_digits_rejected() {
        let err = RelativeOffset::parse_hex("0x10000000000000000").unwrap_err();
        assert!(matches!(err, InputError::HexOverflow { .. }));
        assert_eq!(RelativeOffset::parse_hex("0xffffffffffffffff").unwrap().0, u64::MAX);
    }

    #[test]
    fn test_absolute_offset_is_base_plus_relative() {
        for (base, rel) in [(0x1000, 0), (0x1000, 0x20), (0x1000, 0x340), (0, 0x7fff), (0x40_0000, 0x1234)] {
            assert_eq!(AbsoluteFileOffset::from_base(base, RelativeOffset(rel)).0, base + rel);
        }
    }

    #[test]
    fn test_absolute_offset_wraps() {
        let wrapped = AbsoluteFileOffset::from_base(u64::MAX, RelativeOffset(2));
        assert_eq!(wrapped, AbsoluteFileOffset(1));
    }

    #[test]
    fn test_role_kinds_and_programs() {
        assert_eq!(ProbeRole::ReadEntry.kind(), ProbeKind::Entry);
        assert_eq!(ProbeRole::WriteEntry.kind(), ProbeKind::Entry);
        assert_eq!(ProbeRole::WriteExit.kind(), ProbeKind::Exit);
        assert_eq!(ProbeRole::WriteExit.program_name(), "uretprobe_write_exit");
        assert_eq!(ProbeRole::WriteEntry.to_string(), "write-entry");
    }
}
