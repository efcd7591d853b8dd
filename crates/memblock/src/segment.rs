//! The safe-segment resolver.
//!
//! [`resolve_segment`] is the single algorithm that turns an arbitrary
//! (offset, element count) request into a guaranteed-in-bounds [`Segment`].
//! Every bounds-checked operation in this crate — fill, clear, copy, typed
//! read/write, view construction — resolves a fresh segment against the
//! block's *current* length, which is what lets a block's bounds change
//! between calls without a stale cached range surviving anywhere.
//!
//! The resolver is pure and re-entrant: it works in block-relative byte
//! offsets, never in absolute addresses, so this module contains no
//! `unsafe`. The address is formed at the single point of use, in the
//! block and view constructors.

/// A clamped, in-bounds range derived from a requested offset and element
/// count against a block's current length.
///
/// Ephemeral by design: segments are computed fresh on every call and never
/// cached across calls. The guarantee is `offset + byte_len <= block_len`
/// for the length the segment was resolved against, with `byte_len` always
/// a whole multiple of `item_size` — no partial trailing element is ever
/// exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct Segment {
    /// Byte offset from the start of the block, after clamping.
    pub offset: usize,
    /// Length of the segment in bytes; a multiple of `item_size`.
    pub byte_len: usize,
    /// Size of one element in bytes.
    pub item_size: usize,
    /// Number of whole elements in the segment: `byte_len / item_size`.
    pub item_count: usize,
}

impl Segment {
    /// The empty segment for a given element size.
    pub fn empty(item_size: usize) -> Self {
        Self {
            offset: 0,
            byte_len: 0,
            item_size,
            item_count: 0,
        }
    }

    /// Whether the segment holds no whole element.
    pub fn is_empty(&self) -> bool {
        self.byte_len == 0
    }

    /// One past the last byte of the segment, block-relative.
    pub fn end(&self) -> usize {
        self.offset + self.byte_len
    }
}

/// Resolve a requested `(offset, count)` of elements of `item_size` bytes
/// against a block of `block_len` bytes.
///
/// The clamping policy, in order:
///
/// 1. A negative `offset` clamps to 0. An `offset >= block_len` **wraps**
///    via `offset % block_len`. The wrap is a deliberate permissiveness
///    policy kept from the source system rather than rejecting or emptying
///    the request; it is observable (and tested) as the exact modulo value.
/// 2. The requested byte span is `item_size * count`, saturating.
/// 3. The span clamps to the bytes remaining after the offset.
/// 4. The span floors down to the nearest multiple of `item_size`.
///
/// A `block_len` of 0 (including a disposed block's reported length) and an
/// `item_size` of 0 both resolve to the empty segment.
pub fn resolve_segment(block_len: usize, offset: isize, count: usize, item_size: usize) -> Segment {
    if block_len == 0 || item_size == 0 {
        return Segment::empty(item_size);
    }

    let mut offset = if offset < 0 { 0 } else { offset as usize };
    if offset >= block_len {
        offset %= block_len;
    }

    let requested = item_size.saturating_mul(count);
    let mut byte_len = requested.min(block_len - offset);
    byte_len -= byte_len % item_size;

    Segment {
        offset,
        byte_len,
        item_size,
        item_count: byte_len / item_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_block_resolves_exactly() {
        let seg = resolve_segment(16, 0, 16, 1);
        assert_eq!(seg.offset, 0);
        assert_eq!(seg.byte_len, 16);
        assert_eq!(seg.item_count, 16);
    }

    #[test]
    fn negative_offset_clamps_to_zero() {
        let seg = resolve_segment(16, -7, 4, 1);
        assert_eq!(seg.offset, 0);
        assert_eq!(seg.byte_len, 4);
    }

    #[test]
    fn offset_at_length_wraps_to_zero() {
        // offset == block_len resolves via the wrap formula: 16 % 16 == 0.
        let seg = resolve_segment(16, 16, 4, 1);
        assert_eq!(seg.offset, 0);
        assert_eq!(seg.byte_len, 4);
    }

    #[test]
    fn offset_past_length_wraps_via_modulo() {
        // 21 % 16 == 5: the exact modulo value is the contract.
        let seg = resolve_segment(16, 21, 4, 1);
        assert_eq!(seg.offset, 5);
        assert_eq!(seg.byte_len, 4);
    }

    #[test]
    fn span_clamps_to_remaining_bytes() {
        let seg = resolve_segment(16, 12, 100, 1);
        assert_eq!(seg.offset, 12);
        assert_eq!(seg.byte_len, 4);
        assert_eq!(seg.item_count, 4);
    }

    #[test]
    fn span_floors_to_whole_elements() {
        // 10 bytes remain after offset 6, which holds only two whole
        // 4-byte elements: floor((16 - 6) / 4) * 4 == 8.
        let seg = resolve_segment(16, 6, 100, 4);
        assert_eq!(seg.byte_len, 8);
        assert_eq!(seg.item_count, 2);
    }

    #[test]
    fn zero_count_is_empty_but_keeps_offset() {
        let seg = resolve_segment(16, 4, 0, 4);
        assert_eq!(seg.offset, 4);
        assert!(seg.is_empty());
        assert_eq!(seg.item_count, 0);
    }

    #[test]
    fn zero_length_block_resolves_empty() {
        let seg = resolve_segment(0, 0, 10, 4);
        assert!(seg.is_empty());
        assert_eq!(seg.offset, 0);
    }

    #[test]
    fn zero_item_size_resolves_empty() {
        let seg = resolve_segment(16, 0, 10, 0);
        assert!(seg.is_empty());
    }

    #[test]
    fn saturating_span_does_not_wrap_around() {
        // count * item_size would overflow usize; the span must saturate
        // and then clamp, not wrap to a small number.
        let seg = resolve_segment(16, 0, usize::MAX, 8);
        assert_eq!(seg.byte_len, 16);
        assert_eq!(seg.item_count, 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn segment_is_always_in_bounds(
                block_len in 0usize..4096,
                offset in -64isize..8192,
                count in 0usize..4096,
                item_size in 0usize..64,
            ) {
                let seg = resolve_segment(block_len, offset, count, item_size);
                prop_assert!(seg.end() <= block_len);
                prop_assert!(seg.offset < block_len || seg.offset == 0);
            }

            #[test]
            fn byte_len_is_a_multiple_of_item_size(
                block_len in 1usize..4096,
                offset in -64isize..8192,
                count in 0usize..4096,
                item_size in 1usize..64,
            ) {
                let seg = resolve_segment(block_len, offset, count, item_size);
                prop_assert_eq!(seg.byte_len % item_size, 0);
                prop_assert_eq!(seg.item_count, seg.byte_len / item_size);
            }

            #[test]
            fn never_exceeds_the_request(
                block_len in 1usize..4096,
                offset in 0isize..4096,
                count in 0usize..4096,
                item_size in 1usize..64,
            ) {
                let seg = resolve_segment(block_len, offset, count, item_size);
                prop_assert!(seg.item_count <= count);
            }

            #[test]
            fn resolution_is_idempotent(
                block_len in 1usize..4096,
                offset in -64isize..8192,
                count in 0usize..4096,
                item_size in 1usize..64,
            ) {
                let seg = resolve_segment(block_len, offset, count, item_size);
                let again = resolve_segment(
                    block_len,
                    seg.offset as isize,
                    seg.item_count,
                    item_size,
                );
                // Re-resolving an already-clamped request changes nothing,
                // except that a wrapped-to-empty offset re-clamps to 0.
                if !seg.is_empty() {
                    prop_assert_eq!(seg, again);
                }
            }
        }
    }
}
