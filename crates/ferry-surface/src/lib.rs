//! Rendering targets for decoded guest results.
//!
//! - [`PixelSurface`] / [`SoftwareSurface`]: `0x00RRGGBB` framebuffers.
//! - [`Viewport`]: uniform zoom and pan.
//! - [`draw_rgba`]: clipped nearest-neighbour blit through a viewport.
//! - [`ImageViewer`]: event-driven viewer that redraws from guest memory.
//!
//! Nothing here depends on a windowing system; a host loop translates its
//! platform events into [`ViewerEvent`]s and copies the surface out.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod draw;
pub mod surface;
pub mod viewer;
pub mod viewport;

pub use draw::{draw_rgba, pack_rgb};
pub use surface::{PixelSurface, SoftwareSurface};
pub use viewer::{ImageViewer, ViewerAction, ViewerEvent};
pub use viewport::Viewport;
