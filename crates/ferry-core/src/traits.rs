//! Core abstraction traits for guest memory access and asset retrieval.

use crate::error::{ArenaError, AssetError};
use crate::id::MemoryGeneration;

/// A guest's growable linear memory, as seen from the host.
///
/// Implemented by the Vec-backed `LinearMemory` in `ferry-arena` and by
/// the wasmtime-backed instance memory in `ferry-guest`. Every arena,
/// handle and view operation takes the memory as an explicit argument
/// and resolves against [`data`](GuestMemory::data) at the moment of
/// use. Growth takes `&mut self`, so no borrowed view can outlive it.
pub trait GuestMemory {
    /// The memory's current contents.
    fn data(&self) -> &[u8];

    /// The memory's current contents, mutably.
    fn data_mut(&mut self) -> &mut [u8];

    /// The memory's current generation. Advances on every growth.
    fn generation(&self) -> MemoryGeneration;

    /// Grow the memory so it holds at least `min_bytes` bytes.
    ///
    /// Never shrinks. A request the memory already satisfies is a no-op
    /// that leaves the generation unchanged. Returns the capacity after
    /// the call, or [`ArenaError::GrowthFailure`] if the memory cannot
    /// reach `min_bytes`.
    fn grow_to(&mut self, min_bytes: usize) -> Result<usize, ArenaError>;

    /// Current capacity in bytes.
    fn capacity(&self) -> usize {
        self.data().len()
    }

    /// Bounds-checked shared slice of `len` bytes at `offset`.
    fn slice(&self, offset: usize, len: usize) -> Result<&[u8], ArenaError> {
        let data = self.data();
        let end = checked_end(offset, len, data.len())?;
        Ok(&data[offset..end])
    }

    /// Bounds-checked mutable slice of `len` bytes at `offset`.
    fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], ArenaError> {
        let data = self.data_mut();
        let end = checked_end(offset, len, data.len())?;
        Ok(&mut data[offset..end])
    }
}

impl<M: GuestMemory + ?Sized> GuestMemory for &mut M {
    fn data(&self) -> &[u8] {
        (**self).data()
    }

    fn data_mut(&mut self) -> &mut [u8] {
        (**self).data_mut()
    }

    fn generation(&self) -> MemoryGeneration {
        (**self).generation()
    }

    fn grow_to(&mut self, min_bytes: usize) -> Result<usize, ArenaError> {
        (**self).grow_to(min_bytes)
    }
}

fn checked_end(offset: usize, len: usize, limit: usize) -> Result<usize, ArenaError> {
    match offset.checked_add(len) {
        Some(end) if end <= limit => Ok(end),
        _ => Err(ArenaError::OutOfBounds { offset, len, limit }),
    }
}

/// A source of raw asset bytes (guest module binaries, encoded inputs).
///
/// Retrieval completes, or fails, before any arena operation starts; the
/// rest of the pipeline only ever sees successfully fetched bytes.
pub trait AssetSource {
    /// Fetch the asset registered under `name`.
    fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError>;
}
