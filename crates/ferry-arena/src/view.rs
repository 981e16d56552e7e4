//! Read-only views over guest-produced results.
//!
//! A guest call returns a bare address. It becomes readable only once the
//! host supplies a length derived through some other channel (typically
//! dimensions the guest wrote into scalar slots), at which point an
//! [`UnresolvedResult`] is promoted to a [`ResultView`].
//!
//! A [`ResultView`] captures the memory generation it was built against
//! and refuses to read from a memory that has grown since. Call
//! [`ResultView::rederive`] to re-validate it against the current memory.

use std::fmt;

use ferry_core::{ArenaError, GuestAddress, GuestMemory, MemoryGeneration};

/// Pixel geometry of an image-shaped result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per pixel (4 for RGBA).
    pub channels: u32,
}

impl PixelDimensions {
    /// RGBA geometry: four bytes per pixel.
    pub fn rgba(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: 4,
        }
    }

    /// `width * height * channels`, or `None` if it overflows `u32`.
    pub fn byte_len(&self) -> Option<u32> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.channels)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for PixelDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// An address returned by the guest, not yet paired with a length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct UnresolvedResult {
    address: GuestAddress,
}

impl UnresolvedResult {
    /// Wrap a guest-returned address.
    pub fn new(address: GuestAddress) -> Self {
        Self { address }
    }

    /// The raw address. Needed to hand the allocation back to the guest.
    pub fn address(&self) -> GuestAddress {
        self.address
    }

    /// Whether the guest returned the null address.
    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    /// Promote to a view of `len` bytes over the memory's current storage.
    pub fn resolve<M: GuestMemory + ?Sized>(
        self,
        len: u32,
        memory: &M,
    ) -> Result<ResultView, ArenaError> {
        ResultView::build(self.address, len, None, memory)
    }

    /// Promote to a view of `width * height * channels` bytes.
    pub fn resolve_image<M: GuestMemory + ?Sized>(
        self,
        dimensions: PixelDimensions,
        memory: &M,
    ) -> Result<ResultView, ArenaError> {
        let len = dimensions
            .byte_len()
            .ok_or(ArenaError::AddressSpaceExhausted {
                requested: dimensions
                    .pixel_count()
                    .saturating_mul(u64::from(dimensions.channels)),
            })?;
        ResultView::build(self.address, len, Some(dimensions), memory)
    }
}

/// A read-only, zero-copy view over `[address, address + len)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultView {
    address: GuestAddress,
    len: u32,
    dimensions: Option<PixelDimensions>,
    generation: MemoryGeneration,
}

impl ResultView {
    fn build<M: GuestMemory + ?Sized>(
        address: GuestAddress,
        len: u32,
        dimensions: Option<PixelDimensions>,
        memory: &M,
    ) -> Result<Self, ArenaError> {
        memory.slice(address.as_usize(), len as usize)?;
        Ok(Self {
            address,
            len,
            dimensions,
            generation: memory.generation(),
        })
    }

    /// Start of the viewed range.
    pub fn address(&self) -> GuestAddress {
        self.address
    }

    /// Length of the viewed range in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the view is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pixel geometry, for views built with [`UnresolvedResult::resolve_image`].
    pub fn dimensions(&self) -> Option<PixelDimensions> {
        self.dimensions
    }

    /// Memory generation the view was validated against.
    pub fn generation(&self) -> MemoryGeneration {
        self.generation
    }

    /// Whether `memory` is still at the generation this view was built for.
    pub fn is_current<M: GuestMemory + ?Sized>(&self, memory: &M) -> bool {
        memory.generation() == self.generation
    }

    /// The viewed bytes.
    ///
    /// Fails with [`ArenaError::StaleView`] if the memory has grown since
    /// the view was built.
    pub fn bytes<'m, M: GuestMemory + ?Sized>(
        &self,
        memory: &'m M,
    ) -> Result<&'m [u8], ArenaError> {
        let current = memory.generation();
        if current != self.generation {
            return Err(ArenaError::StaleView {
                captured: self.generation,
                current,
            });
        }
        memory.slice(self.address.as_usize(), self.len as usize)
    }

    /// Re-validate against the memory as it is now.
    pub fn rederive<M: GuestMemory + ?Sized>(&self, memory: &M) -> Result<Self, ArenaError> {
        Self::build(self.address, self.len, self.dimensions, memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::LinearMemory;

    #[test]
    fn image_length_is_product_of_dimensions() {
        let mem = LinearMemory::new(1);
        let view = UnresolvedResult::new(GuestAddress(100))
            .resolve_image(PixelDimensions::rgba(2, 3), &mem)
            .unwrap();
        assert_eq!(view.len(), 24);
        assert_eq!(view.address(), GuestAddress(100));
        assert_eq!(view.dimensions(), Some(PixelDimensions::rgba(2, 3)));
    }

    #[test]
    fn bytes_are_zero_copy() {
        let mut mem = LinearMemory::new(1);
        mem.data_mut()[200..203].copy_from_slice(&[7, 8, 9]);
        let view = UnresolvedResult::new(GuestAddress(200))
            .resolve(3, &mem)
            .unwrap();
        let bytes = view.bytes(&mem).unwrap();
        assert_eq!(bytes, &[7, 8, 9]);
        assert_eq!(bytes.as_ptr(), mem.data()[200..].as_ptr());
    }

    #[test]
    fn range_outside_memory_rejected() {
        let mem = LinearMemory::new(1);
        let result = UnresolvedResult::new(GuestAddress(65_530)).resolve(16, &mem);
        assert!(matches!(result, Err(ArenaError::OutOfBounds { .. })));
    }

    #[test]
    fn overflowing_dimensions_rejected() {
        let mem = LinearMemory::new(1);
        let result = UnresolvedResult::new(GuestAddress(0))
            .resolve_image(PixelDimensions::rgba(u32::MAX, 2), &mem);
        assert!(matches!(
            result,
            Err(ArenaError::AddressSpaceExhausted { .. })
        ));
    }

    #[test]
    fn growth_makes_view_stale_until_rederived() {
        let mut mem = LinearMemory::new(1);
        mem.data_mut()[10] = 42;
        let view = UnresolvedResult::new(GuestAddress(10))
            .resolve(1, &mem)
            .unwrap();
        mem.grow_pages(1).unwrap();

        assert!(!view.is_current(&mem));
        assert_eq!(
            view.bytes(&mem),
            Err(ArenaError::StaleView {
                captured: MemoryGeneration(0),
                current: MemoryGeneration(1),
            })
        );

        let fresh = view.rederive(&mem).unwrap();
        assert_eq!(fresh.generation(), MemoryGeneration(1));
        assert_eq!(fresh.bytes(&mem).unwrap(), &[42]);
    }

    #[test]
    fn null_result_detected() {
        assert!(UnresolvedResult::new(GuestAddress::NULL).is_null());
    }
}
