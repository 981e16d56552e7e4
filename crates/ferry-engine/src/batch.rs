//! One decode round-trip through a guest, as an explicit state machine.
//!
//! ```text
//! Declaring ─commit─► Committed ─populate─► Populated ─call─► Called
//!                                                               │
//!                                Released ◄─release─ Resulted ◄─resolve
//! ```
//!
//! `release` is also accepted straight from `Called`, so a result whose
//! dimensions turn out to be unusable can still be handed back. Every
//! non-null result is freed exactly once; a batch dropped while still
//! holding one logs the leak.

use std::fmt;

use ferry_arena::{
    Arena, ArenaConfig, PixelDimensions, Placement, ResultView, ScratchRegion, SlotDescriptor,
    TypedHandle, UnresolvedResult,
};
use ferry_core::{ArenaError, GuestError, GuestMemory};
use ferry_guest::{CallArg, GuestInstance};

use crate::error::SessionError;

/// Where a [`DecodeBatch`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchPhase {
    /// Slots declared, nothing placed yet.
    Declaring,
    /// Layout committed into guest memory.
    Committed,
    /// Input bytes written.
    Populated,
    /// The decode export returned.
    Called,
    /// The result is readable through a [`ResultView`].
    Resulted,
    /// The result was handed back to the guest.
    Released,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Declaring => "declaring",
            Self::Committed => "committed",
            Self::Populated => "populated",
            Self::Called => "called",
            Self::Resulted => "resulted",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

struct Slots {
    input: SlotDescriptor,
    width: SlotDescriptor,
    height: SlotDescriptor,
}

#[derive(Clone, Copy)]
struct Bound {
    input: TypedHandle,
    width: TypedHandle,
    height: TypedHandle,
}

/// A single decode: input buffer plus two `u32` dimension slots.
pub struct DecodeBatch {
    arena: Arena,
    slots: Slots,
    bound: Option<Bound>,
    phase: BatchPhase,
    result: Option<UnresolvedResult>,
    view: Option<ResultView>,
    scratch_reused: bool,
}

impl DecodeBatch {
    /// Declare the batch's slots: `input_len` input bytes, then width and
    /// height.
    pub fn new(config: ArenaConfig, input_len: u32) -> Result<Self, SessionError> {
        let mut arena = Arena::new(config)?;
        let slots = Slots {
            input: arena.declare_buffer(input_len)?,
            width: arena.declare::<u32>()?,
            height: arena.declare::<u32>()?,
        };
        Ok(Self {
            arena,
            slots,
            bound: None,
            phase: BatchPhase::Declaring,
            result: None,
            view: None,
            scratch_reused: false,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// The guest's result address, until it is released.
    pub fn result(&self) -> Option<UnresolvedResult> {
        self.result
    }

    /// The resolved view, once in [`BatchPhase::Resulted`].
    pub fn view(&self) -> Option<&ResultView> {
        self.view.as_ref()
    }

    /// Handle of the input buffer, once committed.
    pub fn input_handle(&self) -> Option<TypedHandle> {
        self.bound.map(|b| b.input)
    }

    /// Whether the commit reused the session's scratch region.
    pub fn scratch_reused(&self) -> bool {
        self.scratch_reused
    }

    /// Place the layout in guest memory.
    ///
    /// With tail placement the base comes from `scratch`, so consecutive
    /// batches share one host region instead of growing the memory each
    /// time. The region is claimed only once the commit has succeeded.
    pub fn commit(
        &mut self,
        guest: &mut GuestInstance,
        scratch: &mut ScratchRegion,
    ) -> Result<(), SessionError> {
        self.require_phase("commit", &[BatchPhase::Declaring])?;
        let mut memory = guest.memory()?;
        let reservation = match self.arena.config().placement {
            Placement::Tail => {
                let plan = self.arena.plan()?;
                Some(scratch.propose(plan.size(), plan.align(), memory.capacity())?)
            }
            Placement::Fixed(_) => None,
        };
        let placement = reservation.map_or(self.arena.config().placement, |r| r.placement());
        let layout = self.arena.commit_at(&mut memory, placement)?;
        if let Some(reservation) = reservation {
            scratch.claim(reservation);
            self.scratch_reused = reservation.is_reuse();
        }
        self.bound = Some(Bound {
            input: layout.handle(&self.slots.input)?,
            width: layout.handle(&self.slots.width)?,
            height: layout.handle(&self.slots.height)?,
        });
        self.phase = BatchPhase::Committed;
        Ok(())
    }

    /// Write the input and clear the dimension slots.
    ///
    /// `input` must be exactly as long as declared.
    pub fn populate(
        &mut self,
        guest: &mut GuestInstance,
        input: &[u8],
    ) -> Result<(), SessionError> {
        self.require_phase("populate", &[BatchPhase::Committed])?;
        let bound = self.bound("populate")?;
        if input.len() != bound.input.len() as usize {
            return Err(ArenaError::OutOfBounds {
                offset: 0,
                len: input.len(),
                limit: bound.input.len() as usize,
            }
            .into());
        }
        let mut memory = guest.memory()?;
        bound.input.write_bytes(&mut memory, input)?;
        // A reused scratch region still holds the previous batch's values.
        bound.width.set(&mut memory, 0, 0u32)?;
        bound.height.set(&mut memory, 0, 0u32)?;
        self.phase = BatchPhase::Populated;
        Ok(())
    }

    /// Invoke the decode export.
    ///
    /// A null return moves the batch to [`BatchPhase::Called`] with
    /// nothing to release and fails with [`GuestError::NullResult`].
    pub fn call(&mut self, guest: &mut GuestInstance) -> Result<UnresolvedResult, SessionError> {
        self.require_phase("call", &[BatchPhase::Populated])?;
        let bound = self.bound("call")?;
        let export = guest.config().decode_export.clone();
        let result = guest.invoke(
            &export,
            &[
                CallArg::Buffer(bound.input),
                CallArg::Output(bound.width),
                CallArg::Output(bound.height),
            ],
        )?;
        self.phase = BatchPhase::Called;
        if result.is_null() {
            return Err(GuestError::NullResult { export }.into());
        }
        self.result = Some(result);
        Ok(result)
    }

    /// Read back the dimensions the guest wrote.
    pub fn dimensions(
        &self,
        guest: &mut GuestInstance,
        channels: u32,
    ) -> Result<PixelDimensions, SessionError> {
        let bound = self.bound("read dimensions of")?;
        let memory = guest.memory()?;
        Ok(PixelDimensions {
            width: bound.width.get::<u32, _>(&memory, 0)?,
            height: bound.height.get::<u32, _>(&memory, 0)?,
            channels,
        })
    }

    /// Turn the returned address into a view of `width * height * channels`
    /// bytes.
    pub fn resolve(
        &mut self,
        guest: &mut GuestInstance,
        channels: u32,
    ) -> Result<ResultView, SessionError> {
        self.require_phase("resolve", &[BatchPhase::Called])?;
        let result = self.pending_result("resolve")?;
        let dimensions = self.dimensions(guest, channels)?;
        let memory = guest.memory()?;
        let view = result.resolve_image(dimensions, &memory)?;
        self.view = Some(view);
        self.phase = BatchPhase::Resulted;
        Ok(view)
    }

    /// Hand the result back to the guest's free export.
    pub fn release(&mut self, guest: &mut GuestInstance) -> Result<(), SessionError> {
        self.require_phase("release", &[BatchPhase::Called, BatchPhase::Resulted])?;
        let result = self.pending_result("release")?;
        let export = guest.config().free_export.clone();
        guest.invoke_void(&export, &[CallArg::Address(result.address())])?;
        self.result = None;
        self.view = None;
        self.phase = BatchPhase::Released;
        Ok(())
    }

    fn require_phase(
        &self,
        operation: &'static str,
        allowed: &[BatchPhase],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SessionError::BatchState {
                operation,
                phase: self.phase,
            })
        }
    }

    fn bound(&self, operation: &'static str) -> Result<Bound, SessionError> {
        self.bound.ok_or(SessionError::BatchState {
            operation,
            phase: self.phase,
        })
    }

    fn pending_result(&self, operation: &'static str) -> Result<UnresolvedResult, SessionError> {
        self.result.ok_or(SessionError::BatchState {
            operation,
            phase: self.phase,
        })
    }
}

impl Drop for DecodeBatch {
    fn drop(&mut self) {
        if let Some(result) = self.result {
            tracing::warn!(
                address = %result.address(),
                phase = %self.phase,
                "decode batch dropped without release; guest allocation leaked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{GuestAddress, PAGE_SIZE};
    use ferry_guest::GuestConfig;
    use ferry_test_utils::{encode_rgba, wat};

    fn guest(source: &str) -> GuestInstance {
        GuestInstance::new(source.as_bytes(), GuestConfig::default()).unwrap()
    }

    fn live(guest: &mut GuestInstance) -> u32 {
        guest.invoke("live_allocations", &[]).unwrap().address().0
    }

    fn staged(guest: &mut GuestInstance, input: &[u8]) -> DecodeBatch {
        let mut scratch = ScratchRegion::new();
        let mut batch = DecodeBatch::new(ArenaConfig::tail(), input.len() as u32).unwrap();
        batch.commit(guest, &mut scratch).unwrap();
        batch.populate(guest, input).unwrap();
        batch
    }

    #[test]
    fn full_lifecycle() {
        let mut g = guest(wat::DECODER);
        let pixels: Vec<u8> = (0..24).collect();
        let mut batch = staged(&mut g, &encode_rgba(2, 3, &pixels));
        assert_eq!(batch.phase(), BatchPhase::Populated);

        batch.call(&mut g).unwrap();
        assert_eq!(batch.phase(), BatchPhase::Called);

        let view = batch.resolve(&mut g, 4).unwrap();
        assert_eq!(view.len(), 24);
        assert_eq!(view.dimensions(), Some(PixelDimensions::rgba(2, 3)));
        {
            let memory = g.memory().unwrap();
            assert_eq!(view.bytes(&memory).unwrap(), &pixels[..]);
        }
        assert_eq!(live(&mut g), 1);

        batch.release(&mut g).unwrap();
        assert_eq!(batch.phase(), BatchPhase::Released);
        assert_eq!(live(&mut g), 0);
        assert!(batch.result().is_none());
    }

    #[test]
    fn failed_tail_commit_leaves_scratch_unclaimed() {
        let mut g = guest(wat::DECODER);
        let mut scratch = ScratchRegion::new();
        let input = encode_rgba(1, 1, &[170; 4]);

        // Tail commit that cannot grow past the first page.
        let capped = ArenaConfig {
            max_memory_bytes: PAGE_SIZE as u64,
            ..ArenaConfig::tail()
        };
        let mut refused = DecodeBatch::new(capped, input.len() as u32).unwrap();
        assert!(matches!(
            refused.commit(&mut g, &mut scratch),
            Err(SessionError::Arena(ArenaError::GrowthFailure { .. }))
        ));
        assert_eq!(scratch.base(), None);

        // The guest now grows over the page the refused batch proposed.
        let mut decoded = DecodeBatch::new(ArenaConfig::fixed(0), input.len() as u32).unwrap();
        decoded.commit(&mut g, &mut scratch).unwrap();
        decoded.populate(&mut g, &input).unwrap();
        decoded.call(&mut g).unwrap();
        let view = decoded.resolve(&mut g, 4).unwrap();
        assert_eq!(view.address(), GuestAddress(PAGE_SIZE as u32));

        let mut next = DecodeBatch::new(ArenaConfig::tail(), input.len() as u32).unwrap();
        next.commit(&mut g, &mut scratch).unwrap();
        assert!(!next.scratch_reused());
        let input_offset = next.input_handle().unwrap().offset();
        assert!(input_offset >= view.address().0 + view.len());
        next.populate(&mut g, &encode_rgba(1, 1, &[1, 0, 0, 0])).unwrap();

        {
            let memory = g.memory().unwrap();
            let current = view.rederive(&memory).unwrap();
            assert_eq!(current.bytes(&memory).unwrap(), &[170u8; 4]);
        }
        decoded.release(&mut g).unwrap();
    }

    #[test]
    fn out_of_order_transitions_rejected() {
        let mut g = guest(wat::DECODER);
        let mut batch = DecodeBatch::new(ArenaConfig::tail(), 8).unwrap();
        assert_eq!(
            batch.call(&mut g).map(|_| ()),
            Err(SessionError::BatchState {
                operation: "call",
                phase: BatchPhase::Declaring,
            })
        );
        assert!(matches!(
            batch.populate(&mut g, &[0; 8]),
            Err(SessionError::BatchState { .. })
        ));
        assert!(matches!(
            batch.release(&mut g),
            Err(SessionError::BatchState { .. })
        ));
    }

    #[test]
    fn double_release_rejected() {
        let mut g = guest(wat::DECODER);
        let mut batch = staged(&mut g, &encode_rgba(1, 1, &[1, 2, 3, 4]));
        batch.call(&mut g).unwrap();
        batch.release(&mut g).unwrap();
        assert!(matches!(
            batch.release(&mut g),
            Err(SessionError::BatchState {
                phase: BatchPhase::Released,
                ..
            })
        ));
        assert_eq!(live(&mut g), 0);
    }

    #[test]
    fn release_allowed_before_resolve() {
        let mut g = guest(wat::DECODER);
        let mut batch = staged(&mut g, &encode_rgba(1, 1, &[1, 2, 3, 4]));
        batch.call(&mut g).unwrap();
        batch.release(&mut g).unwrap();
        assert!(matches!(
            batch.resolve(&mut g, 4),
            Err(SessionError::BatchState { .. })
        ));
    }

    #[test]
    fn null_result_has_nothing_to_release() {
        let mut g = guest(wat::DECODER);
        let mut batch = staged(&mut g, &[0; 5]);
        assert!(matches!(
            batch.call(&mut g),
            Err(SessionError::Guest(GuestError::NullResult { .. }))
        ));
        assert_eq!(batch.phase(), BatchPhase::Called);
        assert!(matches!(
            batch.release(&mut g),
            Err(SessionError::BatchState { .. })
        ));
    }

    #[test]
    fn wrong_input_length_rejected() {
        let mut g = guest(wat::DECODER);
        let mut scratch = ScratchRegion::new();
        let mut batch = DecodeBatch::new(ArenaConfig::tail(), 12).unwrap();
        batch.commit(&mut g, &mut scratch).unwrap();
        assert!(matches!(
            batch.populate(&mut g, &[0; 4]),
            Err(SessionError::Arena(ArenaError::OutOfBounds { .. }))
        ));
        assert_eq!(batch.phase(), BatchPhase::Committed);
    }

    #[test]
    fn missing_free_export_fails_release() {
        let mut g = guest(wat::DECODER_WITHOUT_FREE);
        let mut batch = staged(&mut g, &encode_rgba(1, 1, &[1, 2, 3, 4]));
        batch.call(&mut g).unwrap();
        batch.resolve(&mut g, 4).unwrap();
        assert_eq!(
            batch.release(&mut g),
            Err(SessionError::Guest(GuestError::MissingExport {
                name: "free".into()
            }))
        );
        assert_eq!(batch.phase(), BatchPhase::Resulted);
    }

    #[test]
    fn trap_leaves_batch_populated() {
        let mut g = guest(wat::TRAPPING);
        let mut batch = staged(&mut g, &encode_rgba(1, 1, &[0; 4]));
        assert!(matches!(
            batch.call(&mut g),
            Err(SessionError::Guest(GuestError::GuestTrap { .. }))
        ));
        assert_eq!(batch.phase(), BatchPhase::Populated);
        assert!(batch.result().is_none());
    }

    #[test]
    fn fixed_placement_bypasses_scratch() {
        let mut g = guest(wat::DECODER);
        let mut scratch = ScratchRegion::new();
        let mut batch = DecodeBatch::new(ArenaConfig::fixed(1024), 8).unwrap();
        batch.commit(&mut g, &mut scratch).unwrap();
        assert_eq!(batch.input_handle().unwrap().offset(), 1024);
        assert!(scratch.base().is_none());
    }
}
