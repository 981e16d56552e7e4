//! Slot declarations: what a batch needs room for, before it has an address.
//!
//! A [`SlotDescriptor`] is produced by each declaration on an
//! [`Arena`](crate::Arena) and consumed when the layout is committed. It
//! carries the [`ArenaId`] of the arena that issued it, so a descriptor
//! can never be resolved against another batch's layout.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ferry_core::{is_valid_alignment, ArenaError, SlotId};

/// Counter for unique [`ArenaId`] allocation.
static ARENA_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for an [`Arena`](crate::Arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u64);

impl ArenaId {
    /// Allocate a fresh, unique arena ID.
    pub fn next() -> Self {
        Self(ARENA_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The shape of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    /// `count` consecutive scalars of `width` bytes each.
    FixedScalar {
        /// Width of one element in bytes (1, 2, 4 or 8).
        width: u32,
        /// Required alignment of the slot's first byte.
        alignment: u32,
        /// Number of elements. 1 for a plain scalar.
        count: u32,
    },
    /// An opaque run of bytes, byte-aligned.
    ByteBuffer {
        /// Length in bytes. Zero is allowed.
        length: u32,
    },
}

impl SlotKind {
    /// Build a validated scalar slot kind.
    pub fn scalar(width: u32, alignment: u32, count: u32) -> Result<Self, ArenaError> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(ArenaError::InvalidSlot {
                reason: format!("scalar width must be 1, 2, 4 or 8 bytes (got {width})"),
            });
        }
        if !is_valid_alignment(alignment) {
            return Err(ArenaError::InvalidSlot {
                reason: format!("alignment must be a power of two (got {alignment})"),
            });
        }
        if width.checked_mul(count).is_none() {
            return Err(ArenaError::InvalidSlot {
                reason: format!("{count} elements of {width} bytes overflow u32"),
            });
        }
        Ok(Self::FixedScalar {
            width,
            alignment,
            count,
        })
    }

    /// Build a byte-buffer slot kind.
    pub fn buffer(length: u32) -> Self {
        Self::ByteBuffer { length }
    }

    /// Total size of the slot in bytes.
    pub fn size(&self) -> u32 {
        match *self {
            // Validated in `scalar()`; saturate rather than wrap for
            // hand-built kinds.
            Self::FixedScalar { width, count, .. } => width.saturating_mul(count),
            Self::ByteBuffer { length } => length,
        }
    }

    /// Required alignment of the slot in bytes.
    pub fn alignment(&self) -> u32 {
        match *self {
            Self::FixedScalar { alignment, .. } => alignment,
            Self::ByteBuffer { .. } => 1,
        }
    }

    /// Width of one addressable element: the scalar width, or 1 for buffers.
    pub fn element_width(&self) -> u32 {
        match *self {
            Self::FixedScalar { width, .. } => width,
            Self::ByteBuffer { .. } => 1,
        }
    }

    /// Whether this is a byte buffer.
    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::ByteBuffer { .. })
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedScalar {
                width,
                alignment,
                count: 1,
            } => write!(f, "scalar({width}B, align {alignment})"),
            Self::FixedScalar {
                width,
                alignment,
                count,
            } => write!(f, "scalar[{count}]({width}B, align {alignment})"),
            Self::ByteBuffer { length } => write!(f, "buffer({length}B)"),
        }
    }
}

/// One declared slot: its kind and its position in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct SlotDescriptor {
    pub(crate) arena: ArenaId,
    pub(crate) id: SlotId,
    pub(crate) kind: SlotKind,
}

impl SlotDescriptor {
    pub(crate) fn new(arena: ArenaId, id: SlotId, kind: SlotKind) -> Self {
        Self { arena, id, kind }
    }

    /// Position of this slot in declaration order.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The slot's shape.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// The arena that issued this descriptor.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_size_is_width_times_count() {
        let kind = SlotKind::scalar(4, 4, 3).unwrap();
        assert_eq!(kind.size(), 12);
        assert_eq!(kind.alignment(), 4);
        assert_eq!(kind.element_width(), 4);
    }

    #[test]
    fn buffer_is_byte_aligned() {
        let kind = SlotKind::buffer(10);
        assert_eq!(kind.size(), 10);
        assert_eq!(kind.alignment(), 1);
        assert_eq!(kind.element_width(), 1);
        assert!(kind.is_buffer());
    }

    #[test]
    fn odd_width_rejected() {
        assert!(matches!(
            SlotKind::scalar(3, 4, 1),
            Err(ArenaError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn non_power_of_two_alignment_rejected() {
        assert!(matches!(
            SlotKind::scalar(4, 6, 1),
            Err(ArenaError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn oversized_array_rejected() {
        assert!(matches!(
            SlotKind::scalar(8, 8, u32::MAX),
            Err(ArenaError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn arena_ids_are_unique() {
        let a = ArenaId::next();
        let b = ArenaId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn display_forms() {
        assert_eq!(SlotKind::scalar(4, 4, 1).unwrap().to_string(), "scalar(4B, align 4)");
        assert_eq!(SlotKind::scalar(2, 2, 5).unwrap().to_string(), "scalar[5](2B, align 2)");
        assert_eq!(SlotKind::buffer(0).to_string(), "buffer(0B)");
    }
}
