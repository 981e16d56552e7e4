//! Guest instance configuration.

use ferry_core::ArenaError;

/// Default name of the decode-style export.
pub const DEFAULT_DECODE_EXPORT: &str = "decode";
/// Default name of the free-style export.
pub const DEFAULT_FREE_EXPORT: &str = "free";
/// Default name of the memory export.
pub const DEFAULT_MEMORY_EXPORT: &str = "memory";
/// Default cap on the guest's linear memory: 256 MiB.
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 256 << 20;

/// Export names and resource limits for a [`GuestInstance`](crate::GuestInstance).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestConfig {
    /// Export called as `(input_off, input_len, width_out, height_out) -> addr`.
    pub decode_export: String,
    /// Export called as `(addr) -> ()` to release a decode result.
    pub free_export: String,
    /// The linear memory export shared with the host.
    pub memory_export: String,
    /// Upper bound on the memory size, enforced for host- and
    /// guest-initiated growth alike.
    pub max_memory_bytes: u64,
}

impl GuestConfig {
    /// Check the config's invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        for (field, value) in [
            ("decode_export", &self.decode_export),
            ("free_export", &self.free_export),
            ("memory_export", &self.memory_export),
        ] {
            if value.is_empty() {
                return Err(ArenaError::InvalidConfig {
                    reason: format!("{field} must not be empty"),
                });
            }
        }
        if self.max_memory_bytes == 0 || self.max_memory_bytes > 1 << 32 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_memory_bytes must be in 1..=4GiB (got {})",
                    self.max_memory_bytes
                ),
            });
        }
        Ok(())
    }
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            decode_export: DEFAULT_DECODE_EXPORT.to_string(),
            free_export: DEFAULT_FREE_EXPORT.to_string(),
            memory_export: DEFAULT_MEMORY_EXPORT.to_string(),
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
        }
    }
}
