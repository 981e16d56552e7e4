//! Strongly-typed identifiers for guest addresses, slots and memory generations.

use std::fmt;

/// An address inside a guest's linear memory.
///
/// Guest memories are 32-bit address spaces. A `GuestAddress` carries no
/// length and no type: it must be paired with an independently derived
/// length before anything is read through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestAddress(pub u32);

impl GuestAddress {
    /// The null address. Guests return it to signal "no result".
    pub const NULL: GuestAddress = GuestAddress(0);

    /// Whether this is the null address.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address as a host index into the memory's byte slice.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GuestAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for GuestAddress {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a slot within one arena batch.
///
/// `SlotId(n)` is the n-th slot declared on the arena, which is also its
/// position in the committed layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Growth counter of a guest memory.
///
/// Incremented every time the memory grows, whether the host or the guest
/// triggered it. Growth may relocate the backing storage, so anything
/// that captured a generation must be re-derived once it changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryGeneration(pub u64);

impl MemoryGeneration {
    /// The generation following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MemoryGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MemoryGeneration {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_address() {
        assert!(GuestAddress::NULL.is_null());
        assert!(!GuestAddress(100).is_null());
    }

    #[test]
    fn address_displays_as_hex() {
        assert_eq!(GuestAddress(255).to_string(), "0x000000ff");
    }

    #[test]
    fn generation_advances() {
        let g = MemoryGeneration::default();
        assert_eq!(g.next(), MemoryGeneration(1));
        assert!(g.next() > g);
    }
}
