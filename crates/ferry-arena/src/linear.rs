//! A host-owned, page-granular linear memory.
//!
//! [`LinearMemory`] behaves like a WebAssembly memory without a runtime:
//! it grows in whole 64 KiB pages up to a maximum, and every growth
//! moves the contents into fresh storage and advances the generation.
//! It backs tests, benchmarks, and hosts that drive the arena directly.

use ferry_core::{pages_for, ArenaError, GuestMemory, MemoryGeneration, PAGE_SIZE};

/// Growable byte buffer with WebAssembly page semantics.
pub struct LinearMemory {
    /// Backing storage. Always `pages * PAGE_SIZE` bytes.
    data: Vec<u8>,
    /// Growth ceiling in pages.
    max_pages: usize,
    /// Bumped on every growth.
    generation: MemoryGeneration,
}

impl LinearMemory {
    /// Largest page count a 32-bit memory can hold (4 GiB).
    pub const MAX_PAGES: usize = 65_536;

    /// Create a zeroed memory of `initial_pages` pages, growable to
    /// [`MAX_PAGES`](Self::MAX_PAGES).
    pub fn new(initial_pages: usize) -> Self {
        let initial_pages = initial_pages.min(Self::MAX_PAGES);
        Self {
            data: vec![0; initial_pages * PAGE_SIZE],
            max_pages: Self::MAX_PAGES,
            generation: MemoryGeneration::default(),
        }
    }

    /// Create a zeroed memory that can never exceed `max_pages` pages.
    pub fn with_max_pages(initial_pages: usize, max_pages: usize) -> Result<Self, ArenaError> {
        if max_pages > Self::MAX_PAGES || initial_pages > max_pages {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "need initial_pages ({initial_pages}) <= max_pages ({max_pages}) <= {}",
                    Self::MAX_PAGES
                ),
            });
        }
        let mut memory = Self::new(initial_pages);
        memory.max_pages = max_pages;
        Ok(memory)
    }

    /// Current size in pages.
    pub fn pages(&self) -> usize {
        self.data.len() / PAGE_SIZE
    }

    /// Growth ceiling in pages.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Grow by `delta` pages, returning the previous page count.
    ///
    /// Mirrors `memory.grow`: a zero delta succeeds without changing
    /// anything, including the generation.
    pub fn grow_pages(&mut self, delta: usize) -> Result<usize, ArenaError> {
        let previous = self.pages();
        if delta == 0 {
            return Ok(previous);
        }
        let target = previous.saturating_add(delta);
        if target > self.max_pages {
            return Err(ArenaError::GrowthFailure {
                requested: target.saturating_mul(PAGE_SIZE),
                capacity: self.data.len(),
                reason: format!("limit is {} pages", self.max_pages),
            });
        }
        // Fresh storage, so anything still pointing at the old buffer is
        // genuinely stale.
        let mut grown = vec![0u8; target * PAGE_SIZE];
        grown[..self.data.len()].copy_from_slice(&self.data);
        self.data = grown;
        self.generation = self.generation.next();
        Ok(previous)
    }
}

impl GuestMemory for LinearMemory {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn generation(&self) -> MemoryGeneration {
        self.generation
    }

    fn grow_to(&mut self, min_bytes: usize) -> Result<usize, ArenaError> {
        if min_bytes <= self.data.len() {
            return Ok(self.data.len());
        }
        let delta = pages_for(min_bytes) - self.pages();
        self.grow_pages(delta)?;
        Ok(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_memory_is_zeroed_pages() {
        let mem = LinearMemory::new(2);
        assert_eq!(mem.pages(), 2);
        assert_eq!(mem.capacity(), 2 * PAGE_SIZE);
        assert!(mem.data().iter().all(|&b| b == 0));
        assert_eq!(mem.generation(), MemoryGeneration(0));
    }

    #[test]
    fn grow_to_rounds_up_to_pages() {
        let mut mem = LinearMemory::new(1);
        let cap = mem.grow_to(PAGE_SIZE + 1).unwrap();
        assert_eq!(cap, 2 * PAGE_SIZE);
        assert_eq!(mem.generation(), MemoryGeneration(1));
    }

    #[test]
    fn satisfied_request_is_noop() {
        let mut mem = LinearMemory::new(1);
        assert_eq!(mem.grow_to(10).unwrap(), PAGE_SIZE);
        assert_eq!(mem.generation(), MemoryGeneration(0));
    }

    #[test]
    fn growth_preserves_contents_and_moves_storage() {
        let mut mem = LinearMemory::new(1);
        mem.data_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
        let before = mem.data().as_ptr();
        mem.grow_pages(1).unwrap();
        assert_ne!(mem.data().as_ptr(), before);
        assert_eq!(&mem.data()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn growth_past_limit_fails() {
        let mut mem = LinearMemory::with_max_pages(1, 2).unwrap();
        let result = mem.grow_to(3 * PAGE_SIZE);
        assert!(matches!(result, Err(ArenaError::GrowthFailure { .. })));
        assert_eq!(mem.pages(), 1);
        assert_eq!(mem.generation(), MemoryGeneration(0));
    }

    #[test]
    fn grow_pages_returns_previous_size() {
        let mut mem = LinearMemory::new(0);
        assert_eq!(mem.grow_pages(3).unwrap(), 0);
        assert_eq!(mem.grow_pages(0).unwrap(), 3);
        assert_eq!(mem.generation(), MemoryGeneration(1));
    }

    #[test]
    fn invalid_limits_rejected() {
        assert!(LinearMemory::with_max_pages(3, 2).is_err());
        assert!(LinearMemory::with_max_pages(0, LinearMemory::MAX_PAGES + 1).is_err());
    }
}
