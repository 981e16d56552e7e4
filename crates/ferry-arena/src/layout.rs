//! Layout planning: turning declared slots into aligned offsets.
//!
//! Planning is a pure function of the declaration sequence. Each slot's
//! offset is the running cursor rounded up to the slot's alignment; the
//! cursor then advances by the slot's size. The same declarations always
//! produce the same offsets.

use smallvec::SmallVec;

use ferry_core::{align_up, ArenaError};

use crate::descriptor::{ArenaId, SlotDescriptor};
use crate::handle::TypedHandle;

/// A slot together with its resolved offset, relative to the layout base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedSlot {
    /// The slot as declared.
    pub descriptor: SlotDescriptor,
    /// Offset from the layout base, in bytes.
    pub offset: u32,
}

impl PlacedSlot {
    /// One past the slot's last byte, relative to the layout base.
    pub fn end(&self) -> u32 {
        self.offset + self.descriptor.kind.size()
    }
}

/// Resolved placement of every slot of one batch.
///
/// Offsets in [`slots`](Layout::slots) are relative to
/// [`base`](Layout::base); handles produced by [`handle`](Layout::handle)
/// carry absolute guest addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    arena: ArenaId,
    base: u32,
    slots: SmallVec<[PlacedSlot; 8]>,
    size: u32,
    align: u32,
}

impl Layout {
    /// Plan offsets for `descriptors` in order, starting at relative offset 0.
    pub(crate) fn plan(arena: ArenaId, descriptors: &[SlotDescriptor]) -> Result<Self, ArenaError> {
        let mut slots = SmallVec::with_capacity(descriptors.len());
        let mut cursor = 0u32;
        let mut align = 1u32;
        for descriptor in descriptors {
            let kind = descriptor.kind;
            let offset = align_up(cursor, kind.alignment()).ok_or(
                ArenaError::AddressSpaceExhausted {
                    requested: u64::from(cursor) + u64::from(kind.alignment()),
                },
            )?;
            cursor = offset
                .checked_add(kind.size())
                .ok_or(ArenaError::AddressSpaceExhausted {
                    requested: u64::from(offset) + u64::from(kind.size()),
                })?;
            align = align.max(kind.alignment());
            slots.push(PlacedSlot {
                descriptor: *descriptor,
                offset,
            });
        }
        Ok(Self {
            arena,
            base: 0,
            slots,
            size: cursor,
            align,
        })
    }

    pub(crate) fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    /// Absolute guest address of the first byte of the layout.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Total size in bytes, from the base to the end of the last slot.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Alignment the base must satisfy: the largest slot alignment.
    pub fn align(&self) -> u32 {
        self.align
    }

    /// One past the layout's last byte, as an absolute guest address.
    pub fn end(&self) -> u64 {
        u64::from(self.base) + u64::from(self.size)
    }

    /// Placed slots in declaration order.
    pub fn slots(&self) -> &[PlacedSlot] {
        &self.slots
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots were declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The arena this layout was planned for.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Offset of a slot relative to the base.
    pub fn offset_of(&self, descriptor: &SlotDescriptor) -> Result<u32, ArenaError> {
        self.placed(descriptor).map(|p| p.offset)
    }

    /// Materialize a slot as a handle bound to its absolute address.
    pub fn handle(&self, descriptor: &SlotDescriptor) -> Result<TypedHandle, ArenaError> {
        let placed = self.placed(descriptor)?;
        Ok(self.bind(placed))
    }

    /// Materialize every slot, in declaration order.
    pub fn handles(&self) -> impl Iterator<Item = TypedHandle> + '_ {
        self.slots.iter().map(|placed| self.bind(placed))
    }

    fn bind(&self, placed: &PlacedSlot) -> TypedHandle {
        TypedHandle::new(
            placed.descriptor.id,
            self.base + placed.offset,
            placed.descriptor.kind,
        )
    }

    fn placed(&self, descriptor: &SlotDescriptor) -> Result<&PlacedSlot, ArenaError> {
        self.slots
            .get(descriptor.id.0 as usize)
            .filter(|p| descriptor.arena == self.arena && p.descriptor == *descriptor)
            .ok_or(ArenaError::UnknownSlot {
                slot: descriptor.id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SlotKind;
    use ferry_core::SlotId;

    fn descriptors(arena: ArenaId, kinds: &[SlotKind]) -> Vec<SlotDescriptor> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, k)| SlotDescriptor::new(arena, SlotId(i as u32), *k))
            .collect()
    }

    #[test]
    fn empty_plan_has_zero_size() {
        let layout = Layout::plan(ArenaId::next(), &[]).unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout.size(), 0);
        assert_eq!(layout.align(), 1);
    }

    #[test]
    fn padding_inserted_before_aligned_slot() {
        let arena = ArenaId::next();
        let descs = descriptors(
            arena,
            &[SlotKind::buffer(3), SlotKind::scalar(8, 8, 1).unwrap()],
        );
        let layout = Layout::plan(arena, &descs).unwrap();
        assert_eq!(layout.slots()[0].offset, 0);
        assert_eq!(layout.slots()[1].offset, 8);
        assert_eq!(layout.size(), 16);
        assert_eq!(layout.align(), 8);
    }

    #[test]
    fn handles_carry_absolute_offsets() {
        let arena = ArenaId::next();
        let descs = descriptors(
            arena,
            &[SlotKind::scalar(4, 4, 1).unwrap(), SlotKind::buffer(6)],
        );
        let layout = Layout::plan(arena, &descs).unwrap().with_base(1024);
        let handles: Vec<_> = layout.handles().collect();
        assert_eq!(handles[0].offset(), 1024);
        assert_eq!(handles[1].offset(), 1028);
        assert_eq!(handles[1].len(), 6);
        assert_eq!(layout.end(), 1034);
    }

    #[test]
    fn foreign_descriptor_is_unknown() {
        let ours = ArenaId::next();
        let theirs = ArenaId::next();
        let layout = Layout::plan(ours, &descriptors(ours, &[SlotKind::buffer(4)])).unwrap();
        let foreign = SlotDescriptor::new(theirs, SlotId(0), SlotKind::buffer(4));
        assert_eq!(
            layout.handle(&foreign),
            Err(ArenaError::UnknownSlot { slot: SlotId(0) })
        );
    }

    #[test]
    fn cursor_overflow_is_reported() {
        let arena = ArenaId::next();
        let descs = descriptors(arena, &[SlotKind::buffer(u32::MAX), SlotKind::buffer(1)]);
        assert!(matches!(
            Layout::plan(arena, &descs),
            Err(ArenaError::AddressSpaceExhausted { .. })
        ));
    }
}
