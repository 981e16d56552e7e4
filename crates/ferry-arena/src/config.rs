//! Arena configuration parameters.

use ferry_core::ArenaError;

/// Where a committed layout starts in guest memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Start at this absolute guest address.
    Fixed(u32),
    /// Start at the current end of guest memory, aligned up to the
    /// layout's alignment. The memory is grown to fit.
    Tail,
}

/// Configuration for an [`Arena`](crate::Arena).
///
/// Validated at arena construction; immutable afterwards.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Where committed layouts are placed.
    ///
    /// Default: [`Placement::Tail`].
    pub placement: Placement,

    /// Upper bound on the memory size a commit may grow to, in bytes.
    ///
    /// Default: 4 GiB, the whole 32-bit guest address space. Commits
    /// that would have to grow the memory past this bound fail with
    /// [`ArenaError::GrowthFailure`] before the memory is touched. A
    /// layout that already fits the current memory is not limited.
    pub max_memory_bytes: u64,
}

impl ArenaConfig {
    /// The full 32-bit guest address space.
    pub const ADDRESS_SPACE_BYTES: u64 = 1 << 32;

    /// Config placing layouts at a fixed base address.
    pub fn fixed(base: u32) -> Self {
        Self {
            placement: Placement::Fixed(base),
            ..Self::default()
        }
    }

    /// Config placing layouts at the tail of guest memory.
    pub fn tail() -> Self {
        Self::default()
    }

    /// Check the config's invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.max_memory_bytes == 0 || self.max_memory_bytes > Self::ADDRESS_SPACE_BYTES {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_memory_bytes must be in 1..={} (got {})",
                    Self::ADDRESS_SPACE_BYTES,
                    self.max_memory_bytes,
                ),
            });
        }
        if let Placement::Fixed(base) = self.placement {
            if u64::from(base) >= self.max_memory_bytes {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "fixed base {base} lies beyond max_memory_bytes ({})",
                        self.max_memory_bytes,
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            placement: Placement::Tail,
            max_memory_bytes: Self::ADDRESS_SPACE_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_tail_over_full_address_space() {
        let config = ArenaConfig::default();
        assert_eq!(config.placement, Placement::Tail);
        assert_eq!(config.max_memory_bytes, 1 << 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fixed_base_preserved() {
        let config = ArenaConfig::fixed(1024);
        assert_eq!(config.placement, Placement::Fixed(1024));
    }

    #[test]
    fn zero_limit_rejected() {
        let config = ArenaConfig {
            max_memory_bytes: 0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn base_beyond_limit_rejected() {
        let config = ArenaConfig {
            placement: Placement::Fixed(4096),
            max_memory_bytes: 4096,
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }
}
