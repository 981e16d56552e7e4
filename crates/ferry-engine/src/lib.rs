//! Decode sessions driving guest modules through the Ferry arena.
//!
//! A [`Session`] fetches a guest module and its input from an
//! [`AssetSource`](ferry_core::AssetSource), instantiates the guest, and
//! runs [`DecodeBatch`]es: declare slots, commit them into guest memory,
//! write the input, call the decoder, resolve the returned address into
//! a [`ResultView`](ferry_arena::ResultView), and finally hand the result
//! back to the guest. Decoded frames are drawn onto a
//! [`PixelSurface`](ferry_surface::PixelSurface) straight from guest
//! memory.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod assets;
pub mod batch;
pub mod config;
pub mod error;
pub mod metrics;
pub mod session;

pub use assets::FsAssetSource;
pub use batch::{BatchPhase, DecodeBatch};
pub use config::SessionConfig;
pub use error::SessionError;
pub use metrics::DecodeMetrics;
pub use session::{DecodedFrame, Session};
