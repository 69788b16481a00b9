//! Attachment strategies
//!
//! Two ways of telling the attachment primitive where to bind:
//!
//! - **Address**: no symbol, the absolute file offset as-is.
//! - **Offset**: an anchor symbol plus `absolute - anchor`, for primitives
//!   that insist on some symbol name.
//!
//! Both land on the same file offset; [`AttachLocation::file_offset`] is the
//! invariant the two share.

use std::fmt;

use crate::domain::{ProbeRole, ResolutionError};

/// Default anchor for offset mode
pub const DEFAULT_ANCHOR: &str = "_start";

/// How the session asks for its probes to be bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachStrategy {
    /// Address mode when the primitive accepts raw addresses, offset mode
    /// through `anchor` otherwise
    Auto { anchor: String },
    Address,
    Offset { anchor: String },
}

impl Default for AttachStrategy {
    fn default() -> Self {
        AttachStrategy::Auto { anchor: DEFAULT_ANCHOR.to_string() }
    }
}

impl AttachStrategy {
    /// Settle `Auto` against what the primitive reports it can do.
    #[must_use]
    pub fn settle(&self, raw_address_supported: bool) -> AttachStrategy {
        match self {
            AttachStrategy::Auto { anchor } if !raw_address_supported => {
                AttachStrategy::Offset { anchor: anchor.clone() }
            }
            AttachStrategy::Auto { .. } => AttachStrategy::Address,
            other => other.clone(),
        }
    }
}

impl fmt::Display for AttachStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachStrategy::Auto { anchor } => write!(f, "auto (anchor {anchor})"),
            AttachStrategy::Address => f.write_str("address"),
            AttachStrategy::Offset { anchor } => write!(f, "offset from {anchor}"),
        }
    }
}

/// Where one probe is bound inside the target file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachLocation {
    Address { file_offset: u64 },
    Anchored { symbol: String, anchor_offset: u64, offset: u64 },
}

impl AttachLocation {
    /// Express `file_offset` relative to an anchor symbol at `anchor_offset`.
    ///
    /// # Errors
    /// Returns [`ResolutionError::AnchorAfterTarget`] when the anchor lies
    /// beyond the target offset; uprobe offsets are unsigned.
    pub fn anchored(symbol: &str, anchor_offset: u64, file_offset: u64) -> Result<Self, ResolutionError> {
        let offset = file_offset.checked_sub(anchor_offset).ok_or_else(|| {
            ResolutionError::AnchorAfterTarget {
                symbol: symbol.to_string(),
                anchor: anchor_offset,
                target: file_offset,
            }
        })?;
        Ok(AttachLocation::Anchored { symbol: symbol.to_string(), anchor_offset, offset })
    }

    /// Effective file offset the probe lands on
    #[must_use]
    pub fn file_offset(&self) -> u64 {
        match self {
            AttachLocation::Address { file_offset } => *file_offset,
            AttachLocation::Anchored { anchor_offset, offset, .. } => anchor_offset + offset,
        }
    }

    /// Symbol handed to the primitive, if any
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            AttachLocation::Address { .. } => None,
            AttachLocation::Anchored { symbol, .. } => Some(symbol),
        }
    }

    /// Offset handed to the primitive alongside [`AttachLocation::symbol`]
    #[must_use]
    pub fn primitive_offset(&self) -> u64 {
        match self {
            AttachLocation::Address { file_offset } => *file_offset,
            AttachLocation::Anchored { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for AttachLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachLocation::Address { file_offset } => write!(f, "file offset 0x{file_offset:x}"),
            AttachLocation::Anchored { symbol, offset, .. } => {
                write!(f, "{symbol}+0x{offset:x} (file offset 0x{:x})", self.file_offset())
            }
        }
    }
}

/// One probe to attach: which program, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub role: ProbeRole,
    pub location: AttachLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_settles_on_capability() {
        let auto = AttachStrategy::default();
        assert_eq!(auto.settle(true), AttachStrategy::Address);
        assert_eq!(auto.settle(false), AttachStrategy::Offset { anchor: "_start".to_string() });
    }

    #[test]
    fn test_explicit_strategies_unchanged() {
        let offset = AttachStrategy::Offset { anchor: "main".to_string() };
        assert_eq!(offset.settle(true), offset);
        assert_eq!(AttachStrategy::Address.settle(false), AttachStrategy::Address);
    }

    #[test]
    fn test_both_modes_land_on_same_offset() {
        for (anchor, target) in [(0x1000, 0x1020), (0x1040, 0x1340), (0x1340, 0x1340)] {
            let address = AttachLocation::Address { file_offset: target };
            let anchored = AttachLocation::anchored("_start", anchor, target).unwrap();
            assert_eq!(address.file_offset(), anchored.file_offset());
            assert_eq!(anchored.primitive_offset(), target - anchor);
            assert_eq!(anchored.symbol(), Some("_start"));
            assert_eq!(address.symbol(), None);
        }
    }

    #[test]
    fn test_anchor_past_target_rejected() {
        let err = AttachLocation::anchored("_start", 0x1100, 0x1020).unwrap_err();
        assert!(matches!(err, ResolutionError::AnchorAfterTarget { anchor: 0x1100, target: 0x1020, .. }));
    }
}
