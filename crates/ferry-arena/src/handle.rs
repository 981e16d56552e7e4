//! Typed handles: committed slots bound to guest addresses.
//!
//! A [`TypedHandle`] is positional. It records where a slot lives and
//! what it holds, and nothing else; every read or write takes the guest
//! memory as an argument and resolves against it on the spot. Growth can
//! replace the memory's backing storage, but it never moves guest
//! addresses, so a handle stays usable across growth while any slice it
//! hands out is confined to a single borrow of the memory.

use std::fmt;

use ferry_core::{ArenaError, GuestMemory, SlotId};

use crate::descriptor::SlotKind;
use crate::scalar::Scalar;

/// A committed slot: absolute offset, length and kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct TypedHandle {
    slot: SlotId,
    offset: u32,
    len: u32,
    kind: SlotKind,
}

impl TypedHandle {
    pub(crate) fn new(slot: SlotId, offset: u32, kind: SlotKind) -> Self {
        Self {
            slot,
            offset,
            len: kind.size(),
            kind,
        }
    }

    /// The slot this handle materializes.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Absolute guest address of the slot's first byte.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Length of the slot in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the slot is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The slot's shape.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Number of addressable elements: scalar count, or byte count for buffers.
    pub fn element_count(&self) -> u32 {
        self.len / self.kind.element_width()
    }

    /// The slot's bytes in the memory's current storage.
    pub fn view<'m, M: GuestMemory + ?Sized>(&self, memory: &'m M) -> Result<&'m [u8], ArenaError> {
        memory.slice(self.offset as usize, self.len as usize)
    }

    /// The slot's bytes in the memory's current storage, mutably.
    pub fn view_mut<'m, M: GuestMemory + ?Sized>(
        &self,
        memory: &'m mut M,
    ) -> Result<&'m mut [u8], ArenaError> {
        memory.slice_mut(self.offset as usize, self.len as usize)
    }

    /// Read element `index` as a `T`.
    ///
    /// Fails with [`ArenaError::WidthMismatch`] if `T` is not as wide as
    /// the slot's elements and with [`ArenaError::OutOfBounds`] if the
    /// element lies past the end of the slot. Neither failure touches
    /// memory.
    pub fn get<T: Scalar, M: GuestMemory + ?Sized>(
        &self,
        memory: &M,
        index: u32,
    ) -> Result<T, ArenaError> {
        let start = self.element_start::<T>(index)?;
        let bytes = memory.slice(start, T::WIDTH as usize)?;
        Ok(T::read_le(bytes))
    }

    /// Write `value` to element `index`. Same failure rules as [`get`](Self::get).
    pub fn set<T: Scalar, M: GuestMemory + ?Sized>(
        &self,
        memory: &mut M,
        index: u32,
        value: T,
    ) -> Result<(), ArenaError> {
        let start = self.element_start::<T>(index)?;
        let bytes = memory.slice_mut(start, T::WIDTH as usize)?;
        value.write_le(bytes);
        Ok(())
    }

    /// Copy `bytes` to the start of the slot.
    ///
    /// `bytes` may be shorter than the slot; the remainder is left as-is.
    pub fn write_bytes<M: GuestMemory + ?Sized>(
        &self,
        memory: &mut M,
        bytes: &[u8],
    ) -> Result<(), ArenaError> {
        if bytes.len() > self.len as usize {
            return Err(ArenaError::OutOfBounds {
                offset: 0,
                len: bytes.len(),
                limit: self.len as usize,
            });
        }
        memory
            .slice_mut(self.offset as usize, bytes.len())?
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Copy the slot's bytes out of guest memory.
    pub fn read_bytes<M: GuestMemory + ?Sized>(&self, memory: &M) -> Result<Vec<u8>, ArenaError> {
        self.view(memory).map(<[u8]>::to_vec)
    }

    /// Absolute start of element `index`, after width and bounds checks.
    fn element_start<T: Scalar>(&self, index: u32) -> Result<usize, ArenaError> {
        let width = self.kind.element_width();
        if T::WIDTH != width {
            return Err(ArenaError::WidthMismatch {
                expected: width,
                actual: T::WIDTH,
            });
        }
        let relative = u64::from(index) * u64::from(width);
        if relative + u64::from(width) > u64::from(self.len) {
            return Err(ArenaError::OutOfBounds {
                offset: relative as usize,
                len: width as usize,
                limit: self.len as usize,
            });
        }
        Ok(self.offset as usize + relative as usize)
    }
}

impl fmt::Display for TypedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TypedHandle(slot={}, off={}, len={}, {})",
            self.slot, self.offset, self.len, self.kind
        )
    }
}
