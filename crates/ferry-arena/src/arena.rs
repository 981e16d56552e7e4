//! The arena: one batch of typed slots inside a guest's memory.
//!
//! Lifecycle:
//!
//! 1. **Declaring:** `declare_*` calls append slot descriptors in order.
//! 2. **Committed:** [`Arena::commit`] plans the layout, places it per the
//!    configured [`Placement`], grows the memory to fit and freezes the
//!    arena. Further declarations or commits fail with
//!    [`ArenaError::CapacityPlanning`].
//!
//! An arena serves exactly one batch. Start a new one for the next.

use ferry_core::{align_up, ArenaError, GuestMemory, MemoryGeneration, SlotId};

use crate::config::{ArenaConfig, Placement};
use crate::descriptor::{ArenaId, SlotDescriptor, SlotKind};
use crate::layout::Layout;
use crate::scalar::Scalar;

enum ArenaState {
    Declaring,
    Committed {
        layout: Layout,
        generation: MemoryGeneration,
    },
}

/// Accumulates slot declarations and commits them into guest memory.
pub struct Arena {
    id: ArenaId,
    config: ArenaConfig,
    slots: Vec<SlotDescriptor>,
    state: ArenaState,
}

impl Arena {
    /// Create an arena, validating `config`.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self {
            id: ArenaId::next(),
            config,
            slots: Vec::new(),
            state: ArenaState::Declaring,
        })
    }

    /// This arena's unique ID.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// The configuration the arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Number of slots declared so far.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Declare a single scalar of `width` bytes at `alignment`.
    pub fn declare_scalar(
        &mut self,
        width: u32,
        alignment: u32,
    ) -> Result<SlotDescriptor, ArenaError> {
        self.declare_scalar_array(width, alignment, 1)
    }

    /// Declare `count` consecutive scalars of `width` bytes at `alignment`.
    pub fn declare_scalar_array(
        &mut self,
        width: u32,
        alignment: u32,
        count: u32,
    ) -> Result<SlotDescriptor, ArenaError> {
        self.ensure_declaring("declare")?;
        let kind = SlotKind::scalar(width, alignment, count)?;
        Ok(self.push(kind))
    }

    /// Declare a single `T`, naturally aligned.
    pub fn declare<T: Scalar>(&mut self) -> Result<SlotDescriptor, ArenaError> {
        self.declare_scalar(T::WIDTH, T::WIDTH)
    }

    /// Declare a byte buffer of `length` bytes. Zero is allowed.
    pub fn declare_buffer(&mut self, length: u32) -> Result<SlotDescriptor, ArenaError> {
        self.ensure_declaring("declare")?;
        Ok(self.push(SlotKind::buffer(length)))
    }

    /// Compute the layout of the slots declared so far, relative to base 0.
    ///
    /// Pure: touches no memory and does not change the arena's state.
    pub fn plan(&self) -> Result<Layout, ArenaError> {
        Layout::plan(self.id, &self.slots)
    }

    /// Commit using the configured placement.
    pub fn commit<M: GuestMemory + ?Sized>(
        &mut self,
        memory: &mut M,
    ) -> Result<&Layout, ArenaError> {
        let placement = self.config.placement;
        self.commit_at(memory, placement)
    }

    /// Commit at an explicit placement, overriding the configured one.
    ///
    /// Grows `memory` to at least `base + size` when it is too small. On
    /// failure the arena stays in the declaring state and the memory is
    /// left untouched.
    pub fn commit_at<M: GuestMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        placement: Placement,
    ) -> Result<&Layout, ArenaError> {
        self.ensure_declaring("commit")?;
        let planned = self.plan()?;

        let capacity = memory.capacity();
        let base = match placement {
            Placement::Fixed(base) => base,
            Placement::Tail => {
                let tail = u32::try_from(capacity).map_err(|_| ArenaError::AddressSpaceExhausted {
                    requested: capacity as u64 + u64::from(planned.size()),
                })?;
                align_up(tail, planned.align()).ok_or(ArenaError::AddressSpaceExhausted {
                    requested: u64::from(tail) + u64::from(planned.align()),
                })?
            }
        };
        if base % planned.align() != 0 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "base {base} is not aligned to the layout's alignment {}",
                    planned.align()
                ),
            });
        }

        let layout = planned.with_base(base);
        let end = layout.end();
        // Every handle address, including the end of a trailing
        // zero-length slot, must fit in a u32.
        if end > u64::from(u32::MAX) {
            return Err(ArenaError::AddressSpaceExhausted { requested: end });
        }
        let grown = end as usize > capacity;
        if grown {
            if end > self.config.max_memory_bytes {
                return Err(ArenaError::GrowthFailure {
                    requested: end as usize,
                    capacity,
                    reason: format!(
                        "growth would exceed max_memory_bytes ({})",
                        self.config.max_memory_bytes
                    ),
                });
            }
            memory.grow_to(end as usize)?;
        }
        tracing::debug!(
            arena = %self.id,
            slots = layout.len(),
            base,
            size = layout.size(),
            grown,
            capacity = memory.capacity(),
            "committed arena layout"
        );

        self.state = ArenaState::Committed {
            layout,
            generation: memory.generation(),
        };
        self.layout()
            .ok_or(ArenaError::CapacityPlanning { operation: "commit" })
    }

    /// The committed layout, if any.
    pub fn layout(&self) -> Option<&Layout> {
        match &self.state {
            ArenaState::Committed { layout, .. } => Some(layout),
            ArenaState::Declaring => None,
        }
    }

    /// Whether the arena has been committed.
    pub fn is_committed(&self) -> bool {
        matches!(self.state, ArenaState::Committed { .. })
    }

    /// Memory generation observed right after commit.
    pub fn committed_generation(&self) -> Option<MemoryGeneration> {
        match self.state {
            ArenaState::Committed { generation, .. } => Some(generation),
            ArenaState::Declaring => None,
        }
    }

    /// Whether `memory` has not grown since commit.
    pub fn is_current<M: GuestMemory + ?Sized>(&self, memory: &M) -> bool {
        self.committed_generation() == Some(memory.generation())
    }

    fn ensure_declaring(&self, operation: &'static str) -> Result<(), ArenaError> {
        match self.state {
            ArenaState::Declaring => Ok(()),
            ArenaState::Committed { .. } => Err(ArenaError::CapacityPlanning { operation }),
        }
    }

    fn push(&mut self, kind: SlotKind) -> SlotDescriptor {
        let descriptor = SlotDescriptor::new(self.id, SlotId(self.slots.len() as u32), kind);
        self.slots.push(descriptor);
        descriptor
    }
}
