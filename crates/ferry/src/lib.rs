//! Ferry: a typed host-side memory arena for calling into WebAssembly guests.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Ferry sub-crates. For most users, adding `ferry` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use ferry::prelude::*;
//!
//! // Plan two dimension slots and an input buffer, then commit them into
//! // a host-side linear memory.
//! let mut memory = LinearMemory::new(1);
//! let mut arena = Arena::new(ArenaConfig::fixed(0)).unwrap();
//! let width = arena.declare::<u32>().unwrap();
//! let height = arena.declare::<u32>().unwrap();
//! let input = arena.declare_buffer(16).unwrap();
//! let layout = arena.commit(&mut memory).unwrap();
//!
//! let w = layout.handle(&width).unwrap();
//! let h = layout.handle(&height).unwrap();
//! layout.handle(&input).unwrap().write_bytes(&mut memory, &[0xff; 16]).unwrap();
//! w.set(&mut memory, 0, 2u32).unwrap();
//! h.set(&mut memory, 0, 2u32).unwrap();
//!
//! // A guest would return this address; here it is the input buffer.
//! let dims = PixelDimensions::rgba(
//!     w.get::<u32, _>(&memory, 0).unwrap(),
//!     h.get::<u32, _>(&memory, 0).unwrap(),
//! );
//! let view = UnresolvedResult::new(GuestAddress(8))
//!     .resolve_image(dims, &memory)
//!     .unwrap();
//! assert_eq!(view.bytes(&memory).unwrap(), &[0xffu8; 16]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ferry-core` | Addresses, generations, errors, `GuestMemory` |
//! | [`arena`] | `ferry-arena` | Slot layout, handles, result views, scratch |
//! | [`guest`] | `ferry-guest` | wasmtime guest instances and export calls |
//! | [`surface`] | `ferry-surface` | Pixel surfaces, viewport and image viewer |
//! | [`engine`] | `ferry-engine` | Decode sessions and asset sources |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`ferry-core`).
///
/// Contains [`types::GuestAddress`], [`types::MemoryGeneration`], the
/// error enums, and the [`types::GuestMemory`] and
/// [`types::AssetSource`] traits.
pub use ferry_core as types;

/// Slot layout and zero-copy views (`ferry-arena`).
///
/// [`arena::Arena`] plans and commits a batch of slots,
/// [`arena::TypedHandle`] reads and writes them, and
/// [`arena::ResultView`] borrows guest-returned data.
pub use ferry_arena as arena;

/// Guest instances (`ferry-guest`).
///
/// [`guest::GuestInstance`] wraps a wasmtime instance and exposes its
/// memory through [`guest::InstanceMemory`].
pub use ferry_guest as guest;

/// Presentation (`ferry-surface`).
pub use ferry_surface as surface;

/// Decode sessions (`ferry-engine`).
///
/// [`engine::Session`] runs [`engine::DecodeBatch`]es end to end.
pub use ferry_engine as engine;

/// Common imports for typical Ferry usage.
///
/// ```rust
/// use ferry::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use ferry_core::{AssetSource, GuestAddress, GuestMemory, MemoryGeneration, SlotId};

    // Errors
    pub use ferry_core::{ArenaError, AssetError, GuestError};

    // Arena
    pub use ferry_arena::{
        Arena, ArenaConfig, LinearMemory, PixelDimensions, Placement, ResultView, ScratchRegion,
        TypedHandle, UnresolvedResult,
    };

    // Guest
    pub use ferry_guest::{CallArg, GuestConfig, GuestInstance};

    // Surface
    pub use ferry_surface::{ImageViewer, PixelSurface, SoftwareSurface, Viewport};

    // Engine
    pub use ferry_engine::{
        DecodeBatch, DecodeMetrics, DecodedFrame, FsAssetSource, Session, SessionConfig,
        SessionError,
    };
}
