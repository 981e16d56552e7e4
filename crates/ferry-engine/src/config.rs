//! Session configuration.

use ferry_arena::ArenaConfig;
use ferry_guest::GuestConfig;

use crate::error::SessionError;

/// Default asset name of the guest module.
pub const DEFAULT_MODULE_ASSET: &str = "decoder.wasm";
/// Default asset name of the encoded input.
pub const DEFAULT_IMAGE_ASSET: &str = "image.raw";
/// Default bytes per decoded pixel (RGBA).
pub const DEFAULT_CHANNELS: u32 = 4;

/// Everything a [`Session`](crate::Session) needs to load and decode.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Asset name of the guest module (binary or WAT text).
    pub module_asset: String,
    /// Asset name of the encoded input handed to the decoder.
    pub image_asset: String,
    /// Bytes per pixel of the decoded output. Default: 4.
    pub channels: u32,
    /// Placement and growth limits for per-batch arenas. Default: tail
    /// placement, so host scratch never overlaps guest allocations.
    pub arena: ArenaConfig,
    /// Guest export names and memory limit.
    pub guest: GuestConfig,
}

impl SessionConfig {
    /// Config loading `module` and `image` with every other field defaulted.
    pub fn new(module: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            module_asset: module.into(),
            image_asset: image.into(),
            ..Self::default()
        }
    }

    /// Check every invariant, including the nested arena and guest configs.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.module_asset.is_empty() {
            return Err(SessionError::Config {
                reason: "module_asset must not be empty".into(),
            });
        }
        if self.image_asset.is_empty() {
            return Err(SessionError::Config {
                reason: "image_asset must not be empty".into(),
            });
        }
        if !(1..=4).contains(&self.channels) {
            return Err(SessionError::Config {
                reason: format!("channels must be in 1..=4, got {}", self.channels),
            });
        }
        self.arena.validate().map_err(|e| SessionError::Config {
            reason: format!("arena: {e}"),
        })?;
        self.guest.validate().map_err(|e| SessionError::Config {
            reason: format!("guest: {e}"),
        })?;
        if self.arena.max_memory_bytes > self.guest.max_memory_bytes {
            tracing::debug!(
                arena = self.arena.max_memory_bytes,
                guest = self.guest.max_memory_bytes,
                "arena growth limit exceeds guest memory limit; guest limit applies"
            );
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            module_asset: DEFAULT_MODULE_ASSET.into(),
            image_asset: DEFAULT_IMAGE_ASSET.into(),
            channels: DEFAULT_CHANNELS,
            arena: ArenaConfig::tail(),
            guest: GuestConfig::default(),
        }
    }
}
