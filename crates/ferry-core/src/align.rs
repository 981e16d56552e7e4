//! Alignment arithmetic shared by layout planning and scratch placement.

/// Whether `alignment` is usable as a slot alignment (a non-zero power of two).
pub fn is_valid_alignment(alignment: u32) -> bool {
    alignment.is_power_of_two()
}

/// Round `value` up to the next multiple of `alignment`.
///
/// Returns `None` if the rounded value does not fit in a `u32` (guest
/// addresses are 32-bit) or if `alignment` is not a power of two.
pub fn align_up(value: u32, alignment: u32) -> Option<u32> {
    if !is_valid_alignment(alignment) {
        return None;
    }
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}
