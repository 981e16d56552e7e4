//! Typed slot layout and zero-copy views over a guest's linear memory.
//!
//! The arena plans where a batch of host-written values lives inside a
//! guest's memory, grows that memory when the plan does not fit, and
//! hands back positional handles. Handles and views never hold on to the
//! memory: every access takes a [`GuestMemory`](ferry_core::GuestMemory)
//! argument and resolves against it at that moment.
//!
//! # Architecture
//!
//! ```text
//! Arena (one batch)
//! ├── SlotDescriptor × N (declared in order)
//! ├── Layout (offsets, size, alignment; relative to a base)
//! │   └── TypedHandle × N (absolute offset + length + kind)
//! └── commit() ──► GuestMemory::grow_to(base + size)
//!
//! UnresolvedResult (guest-returned address, no length)
//! └── resolve(len) ──► ResultView (address + length + generation)
//! ```
//!
//! # Placement
//!
//! - **Fixed:** the layout starts at a caller-chosen base address.
//! - **Tail:** the layout starts at the current end of memory, which is
//!   grown to fit. Host data placed there can never overlap guest
//!   allocations, since the guest only obtains memory through growth.
//!
//! [`ScratchRegion`] remembers a tail reservation so later batches can
//! reuse it instead of growing the memory every time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod descriptor;
pub mod handle;
pub mod layout;
pub mod linear;
pub mod scalar;
pub mod scratch;
pub mod view;

// Public re-exports for the primary API surface.
pub use arena::Arena;
pub use config::{ArenaConfig, Placement};
pub use descriptor::{ArenaId, SlotDescriptor, SlotKind};
pub use handle::TypedHandle;
pub use layout::{Layout, PlacedSlot};
pub use linear::LinearMemory;
pub use scalar::Scalar;
pub use scratch::{Reservation, ScratchRegion};
pub use view::{PixelDimensions, ResultView, UnresolvedResult};
