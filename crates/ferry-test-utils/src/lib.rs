//! Test utilities and fixtures for Ferry development.
//!
//! Provides WAT guest modules ([`wat`]), an in-memory [`AssetSource`]
//! and helpers for building raw RGBA test images.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod wat;

use std::collections::HashMap;

use ferry_core::{AssetError, AssetSource};

/// Header size of the raw image format: width and height as `u32` LE.
pub const RAW_HEADER_LEN: usize = 8;

/// Encode an image as `[width u32 LE][height u32 LE][pixels]`, the input
/// format the fixture decoders understand.
pub fn encode_rgba(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RAW_HEADER_LEN + pixels.len());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(pixels);
    out
}

/// RGBA pixels of a two-colour checkerboard with `cell`-pixel squares.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> Vec<u8> {
    let cell = cell.max(1);
    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if light { 0xee } else { 0x22 };
            out.extend_from_slice(&[v, v, v, 0xff]);
        }
    }
    out
}

/// Asset source backed by a `HashMap`.
///
/// Assets registered with [`fail`](MemoryAssetSource::fail) return a
/// transport error when fetched.
#[derive(Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Result<Vec<u8>, String>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `name`, builder style.
    pub fn with_asset(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(name.into(), Ok(bytes.into()));
    }

    /// Make fetches of `name` fail with a transport error.
    pub fn fail(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.assets.insert(name.into(), Err(reason.into()));
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        match self.assets.get(name) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(reason)) => Err(AssetError::Transport {
                name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(AssetError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}
