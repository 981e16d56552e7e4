//! Fixed-width scalars that can live in a slot.
//!
//! Scalars are stored little-endian, matching WebAssembly's memory model.

use std::fmt;

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width value readable from and writable to guest memory.
///
/// Sealed: implemented for the primitive integer and float types only.
pub trait Scalar: sealed::Sealed + Copy + fmt::Debug + 'static {
    /// Width of the value in bytes.
    const WIDTH: u32;

    /// Decode from exactly [`WIDTH`](Scalar::WIDTH) little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into exactly [`WIDTH`](Scalar::WIDTH) bytes, little-endian.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_scalar {
    ($($ty:ty),*$(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Scalar for $ty {
            const WIDTH: u32 = std::mem::size_of::<$ty>() as u32;

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
