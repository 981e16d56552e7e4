//! Core types and traits for the Ferry guest-memory boundary.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Ferry workspace:
//! guest addresses, memory generations, the error taxonomy, and the
//! [`GuestMemory`] and [`AssetSource`] traits that every other crate
//! programs against.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod align;
pub mod error;
pub mod id;
pub mod traits;

pub use align::{align_up, is_valid_alignment};
pub use error::{ArenaError, AssetError, GuestError};
pub use id::{GuestAddress, MemoryGeneration, SlotId};
pub use traits::{AssetSource, GuestMemory};

/// Size of one WebAssembly linear-memory page in bytes.
///
/// Guest memories only grow in whole pages; every capacity reported by a
/// [`GuestMemory`] is a multiple of this value.
pub const PAGE_SIZE: usize = 65_536;

/// Number of pages needed to hold `bytes` bytes, rounded up.
pub fn pages_for(bytes: usize) -> usize {
    bytes.div_ceil(PAGE_SIZE)
}
