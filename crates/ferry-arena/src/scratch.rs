//! Host scratch space at the tail of guest memory.
//!
//! A guest only ever obtains memory by growing it, so bytes the host
//! itself grew the memory over belong to the host for good.
//! [`ScratchRegion`] remembers the last such region; later batches that fit
//! inside it reuse it instead of growing the memory again. A region is
//! only recorded after the commit that grew memory over it succeeded, so a
//! failed commit never leaves behind a claim on bytes the guest may later
//! allocate. Whatever an aborted batch wrote is simply overwritten by the
//! next one.

use ferry_core::{align_up, ArenaError, PAGE_SIZE};

use crate::config::Placement;

/// A proposed scratch placement, not yet owned by the host.
///
/// Produced by [`ScratchRegion::propose`]; becomes the region only once
/// [`ScratchRegion::claim`] is called after a successful commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reservation {
    base: u32,
    len: u32,
    reused: bool,
}

impl Reservation {
    /// Where to commit the layout.
    pub fn placement(&self) -> Placement {
        Placement::Fixed(self.base)
    }

    /// Start of the reserved bytes.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Whether this reuses the existing region.
    pub fn is_reuse(&self) -> bool {
        self.reused
    }
}

/// The host's reusable tail reservation.
#[derive(Clone, Debug, Default)]
pub struct ScratchRegion {
    base: Option<u32>,
    len: u32,
    reuses: u64,
    relocations: u64,
}

impl ScratchRegion {
    /// An empty region; the first reservation always goes to the tail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose where a layout of `size` bytes aligned to `align` goes.
    ///
    /// `capacity` is the memory's current size. The existing region is
    /// reused when it is large enough and suitably aligned; otherwise a
    /// fresh region starts at `capacity` rounded up to `align` and runs to
    /// the next page boundary past the layout. Nothing is recorded: a
    /// fresh region only becomes the host's once the commit that grows
    /// memory over it has succeeded and [`claim`](Self::claim) is called.
    pub fn propose(
        &self,
        size: u32,
        align: u32,
        capacity: usize,
    ) -> Result<Reservation, ArenaError> {
        if let Some(base) = self.base {
            if size <= self.len && base % align.max(1) == 0 {
                return Ok(Reservation {
                    base,
                    len: self.len,
                    reused: true,
                });
            }
        }

        let exhausted = ArenaError::AddressSpaceExhausted {
            requested: capacity as u64 + u64::from(size),
        };
        let tail = u32::try_from(capacity).map_err(|_| exhausted.clone())?;
        let base = align_up(tail, align).ok_or_else(|| exhausted.clone())?;
        let end = u64::from(base) + u64::from(size);
        let page = PAGE_SIZE as u64;
        let region_end = end.div_ceil(page) * page;
        let len = u32::try_from(region_end - u64::from(base)).map_err(|_| exhausted)?;
        Ok(Reservation {
            base,
            len,
            reused: false,
        })
    }

    /// Record `reservation` as committed.
    pub fn claim(&mut self, reservation: Reservation) {
        if reservation.reused {
            self.reuses += 1;
            return;
        }
        if let Some(previous) = self.base {
            self.relocations += 1;
            tracing::warn!(
                from = previous,
                to = reservation.base,
                len = reservation.len,
                "scratch region too small, relocating to memory tail"
            );
        } else {
            tracing::debug!(
                base = reservation.base,
                len = reservation.len,
                "reserved scratch region"
            );
        }
        self.base = Some(reservation.base);
        self.len = reservation.len;
    }

    /// Start of the current region, if one has been reserved.
    pub fn base(&self) -> Option<u32> {
        self.base
    }

    /// Length of the current region in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no bytes are reserved.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many reservations were served from the existing region.
    pub fn reuses(&self) -> u64 {
        self.reuses
    }

    /// How many times the region moved to a new tail.
    pub fn relocations(&self) -> u64 {
        self.relocations
    }
}
