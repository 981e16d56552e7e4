//! Benchmark profiles and utilities for the Ferry guest memory arena.
//!
//! Provides pre-built batch shapes and sessions for benchmarks:
//!
//! - [`decode_shaped_arena`]: two dimension slots plus an input buffer
//! - [`mixed_arena`]: many scalars of every width, for layout planning
//! - [`decoder_session`]: a session over the fixture decoder and a
//!   generated checkerboard

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ferry_arena::{Arena, ArenaConfig, SlotDescriptor};
use ferry_core::ArenaError;
use ferry_engine::{Session, SessionConfig, SessionError};
use ferry_test_utils::{checkerboard, encode_rgba, wat};

/// Declare the slots of one decode batch: width, height, input buffer.
///
/// Returns the arena and the input buffer's descriptor.
pub fn decode_shaped_arena(
    config: ArenaConfig,
    input_len: u32,
) -> Result<(Arena, SlotDescriptor), ArenaError> {
    let mut arena = Arena::new(config)?;
    arena.declare::<u32>()?;
    arena.declare::<u32>()?;
    let input = arena.declare_buffer(input_len)?;
    Ok((arena, input))
}

/// An arena with `n` scalar slots cycling through widths 1, 2, 4 and 8,
/// each aligned to its width, with a buffer after every eighth slot.
pub fn mixed_arena(n: u32) -> Result<Arena, ArenaError> {
    let mut arena = Arena::new(ArenaConfig::fixed(0))?;
    for i in 0..n {
        let width = 1 << (i % 4);
        arena.declare_scalar(width, width)?;
        if i % 8 == 7 {
            arena.declare_buffer(i + 1)?;
        }
    }
    Ok(arena)
}

/// A session decoding a `width` x `height` checkerboard with the fixture
/// decoder.
pub fn decoder_session(width: u32, height: u32) -> Result<Session, SessionError> {
    let input = encode_rgba(width, height, &checkerboard(width, height, 8));
    Session::from_bytes(wat::DECODER.as_bytes(), input, SessionConfig::default())
}
