//! Zero-copy typed views over a block's bytes.
//!
//! A [`View`] reinterprets a resolved segment as a sequence of fixed-size
//! elements without copying. Views are constructible only through the
//! segment resolver — never by ad hoc pointer casting — so a view can only
//! ever address bytes inside its block. The borrow ties the view's
//! lifetime to the block: a live view statically rules out the `resize` or
//! `dispose` that would invalidate it.
//!
//! Element types are [`bytemuck::Pod`], which makes any bit pattern a
//! valid value. Because a byte offset need not respect `align_of::<T>()`,
//! element access goes through unaligned loads and stores; views hand out
//! values, not references.
//!
//! Offsets here are in *elements*, converted to bytes before resolution.
//! The scalar layer in [`crate::rw`] works in byte offsets instead.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

use bytemuck::Pod;
use memblock_core::{BlockError, RawAlloc};

use crate::block::Block;
use crate::segment::{resolve_segment, Segment};

/// A read-only zero-copy view of a block's bytes as elements of `T`.
#[derive(Clone, Copy)]
pub struct View<'a, T: Pod> {
    ptr: NonNull<u8>,
    count: usize,
    _marker: PhantomData<&'a [T]>,
}

/// A mutable zero-copy view of a block's bytes as elements of `T`.
pub struct ViewMut<'a, T: Pod> {
    ptr: NonNull<u8>,
    count: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// Views hand out `T` by value and `T: Pod` is always Send + Sync.
unsafe impl<T: Pod> Send for View<'_, T> {}
unsafe impl<T: Pod> Sync for View<'_, T> {}
unsafe impl<T: Pod> Send for ViewMut<'_, T> {}
unsafe impl<T: Pod> Sync for ViewMut<'_, T> {}

/// Element iterator over a view, yielding copies.
pub struct ViewIter<'a, T: Pod> {
    ptr: NonNull<u8>,
    remaining: usize,
    _marker: PhantomData<&'a [T]>,
}

impl<A: RawAlloc> Block<A> {
    fn resolve_view<T: Pod>(&self, offset_elems: isize, count: usize) -> Segment {
        let item_size = mem::size_of::<T>();
        let byte_offset = offset_elems.saturating_mul(item_size as isize);
        resolve_segment(self.byte_len(), byte_offset, count, item_size)
    }

    /// A read-only view of `count` elements of `T` starting at element
    /// offset `offset_elems`.
    ///
    /// The view covers at most the whole elements the block can hold at
    /// that offset; a `count` of 0 yields an empty, valid view. Fails only
    /// with [`BlockError::Disposed`].
    pub fn view<T: Pod>(&self, offset_elems: isize, count: usize) -> Result<View<'_, T>, BlockError> {
        self.ensure_live()?;
        let seg = self.resolve_view::<T>(offset_elems, count);
        // SAFETY: the resolver guarantees the segment is in bounds, and
        // the shared borrow keeps the block alive and un-resized.
        Ok(unsafe { View::from_segment(self.base(), seg) })
    }

    /// A read-only view of all whole elements from element offset
    /// `offset_elems` to the end of the block.
    pub fn view_from<T: Pod>(&self, offset_elems: isize) -> Result<View<'_, T>, BlockError> {
        self.view(offset_elems, self.byte_len())
    }

    /// A read-only view of the whole block.
    pub fn view_all<T: Pod>(&self) -> Result<View<'_, T>, BlockError> {
        self.view(0, self.byte_len())
    }

    /// A mutable view of `count` elements of `T` starting at element
    /// offset `offset_elems`.
    ///
    /// Same clamping and error semantics as [`Block::view`].
    pub fn view_mut<T: Pod>(
        &mut self,
        offset_elems: isize,
        count: usize,
    ) -> Result<ViewMut<'_, T>, BlockError> {
        self.ensure_live()?;
        let seg = self.resolve_view::<T>(offset_elems, count);
        // SAFETY: as in `view`, with the exclusive borrow additionally
        // ruling out any concurrent access to the bytes.
        Ok(unsafe { ViewMut::from_segment(self.base(), seg) })
    }

    /// A mutable view of all whole elements from element offset
    /// `offset_elems` to the end of the block.
    pub fn view_from_mut<T: Pod>(&mut self, offset_elems: isize) -> Result<ViewMut<'_, T>, BlockError> {
        self.view_mut(offset_elems, self.byte_len())
    }

    /// A mutable view of the whole block.
    pub fn view_all_mut<T: Pod>(&mut self) -> Result<ViewMut<'_, T>, BlockError> {
        self.view_mut(0, self.byte_len())
    }
}

impl<'a, T: Pod> View<'a, T> {
    /// # Safety
    ///
    /// `seg` must have been resolved against the block whose base address
    /// is `base`, with the block borrowed for `'a`.
    pub(crate) unsafe fn from_segment(base: NonNull<u8>, seg: Segment) -> Self {
        Self {
            ptr: NonNull::new_unchecked(base.as_ptr().add(seg.offset)),
            count: seg.item_count,
            _marker: PhantomData,
        }
    }

    /// Number of whole elements in the view.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the view holds no element.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The element at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.count {
            return None;
        }
        // SAFETY: `index` is within the resolved segment; the load is
        // unaligned because byte offsets need not respect align_of::<T>().
        Some(unsafe { ptr::read_unaligned(self.ptr.as_ptr().cast::<T>().add(index)) })
    }

    /// Iterate over the elements by value.
    pub fn iter(&self) -> ViewIter<'a, T> {
        ViewIter {
            ptr: self.ptr,
            remaining: self.count,
            _marker: PhantomData,
        }
    }

    /// Collect the elements into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<'a, T: Pod> ViewMut<'a, T> {
    /// # Safety
    ///
    /// As [`View::from_segment`], with the block borrowed mutably.
    pub(crate) unsafe fn from_segment(base: NonNull<u8>, seg: Segment) -> Self {
        Self {
            ptr: NonNull::new_unchecked(base.as_ptr().add(seg.offset)),
            count: seg.item_count,
            _marker: PhantomData,
        }
    }

    /// Number of whole elements in the view.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the view holds no element.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The element at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.count {
            return None;
        }
        // SAFETY: as in `View::get`.
        Some(unsafe { ptr::read_unaligned(self.ptr.as_ptr().cast::<T>().add(index)) })
    }

    /// Store `value` at `index`.
    ///
    /// Fails with [`BlockError::OutOfRange`] past the end of the view.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), BlockError> {
        let item_size = mem::size_of::<T>();
        if index >= self.count {
            return Err(BlockError::OutOfRange {
                offset: index.saturating_mul(item_size),
                item_size,
                available: 0,
            });
        }
        // SAFETY: `index` is within the resolved segment; unaligned store
        // for the same reason the loads are unaligned.
        unsafe {
            ptr::write_unaligned(self.ptr.as_ptr().cast::<T>().add(index), value);
        }
        Ok(())
    }

    /// Store `value` into every element of the view.
    pub fn fill_with(&mut self, value: T) {
        for index in 0..self.count {
            // SAFETY: every index below `count` is within the segment.
            unsafe {
                ptr::write_unaligned(self.ptr.as_ptr().cast::<T>().add(index), value);
            }
        }
    }

    /// Iterate over the elements by value.
    pub fn iter(&self) -> ViewIter<'_, T> {
        ViewIter {
            ptr: self.ptr,
            remaining: self.count,
            _marker: PhantomData,
        }
    }

    /// Collect the elements into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Pod> Iterator for ViewIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: `remaining > 0` means the cursor is still inside the
        // segment the iterator was created from.
        let value = unsafe { ptr::read_unaligned(self.ptr.as_ptr().cast::<T>()) };
        // SAFETY: advancing by one element stays within or one past the
        // segment, both valid cursor positions.
        self.ptr = unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(mem::size_of::<T>())) };
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Pod> ExactSizeIterator for ViewIter<'_, T> {}

impl<'a, T: Pod> IntoIterator for &View<'a, T> {
    type Item = T;
    type IntoIter = ViewIter<'a, T>;

    fn into_iter(self) -> ViewIter<'a, T> {
        self.iter()
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for View<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for ViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_reinterprets_without_copying() {
        let block = Block::from_elements::<u32>(&[20, 30, 40]);
        let view = block.view_all::<u32>().unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.to_vec(), vec![20, 30, 40]);
    }

    #[test]
    fn view_offset_is_in_elements() {
        let block = Block::from_elements::<u32>(&[20, 30, 40, 50]);
        let view = block.view_from::<u32>(1).unwrap();
        assert_eq!(view.to_vec(), vec![30, 40, 50]);
    }

    #[test]
    fn view_count_clamps_to_whole_elements() {
        // 10 bytes hold two whole u32s; the trailing 2 bytes are never
        // exposed as a partial element.
        let block = Block::alloc(10, true);
        let view = block.view_all::<u32>().unwrap();
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn zero_count_view_is_empty_and_valid() {
        let block = Block::alloc(16, true);
        let view = block.view::<u32>(0, 0).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.get(0), None);
    }

    #[test]
    fn view_on_disposed_block_fails() {
        let mut block = Block::alloc(16, true);
        let id = block.id();
        block.dispose();
        assert_eq!(
            block.view_all::<u32>().map(|v| v.len()),
            Err(BlockError::Disposed { id })
        );
    }

    #[test]
    fn view_mut_writes_through_to_the_block() {
        let mut block = Block::with_capacity_of::<u32>(4).unwrap();
        {
            let mut view = block.view_all_mut::<u32>().unwrap();
            view.set(0, 11).unwrap();
            view.set(3, 44).unwrap();
            assert!(view.set(4, 99).is_err());
        }
        assert_eq!(
            block.view_all::<u32>().unwrap().to_vec(),
            vec![11, 0, 0, 44]
        );
    }

    #[test]
    fn fill_with_sets_every_element() {
        let mut block = Block::with_capacity_of::<u16>(5).unwrap();
        block.view_all_mut::<u16>().unwrap().fill_with(7);
        assert_eq!(
            block.view_all::<u16>().unwrap().to_vec(),
            vec![7, 7, 7, 7, 7]
        );
    }

    #[test]
    fn iterator_is_exact_size() {
        let block = Block::from_elements::<u64>(&[1, 2, 3, 4]);
        let view = block.view_all::<u64>().unwrap();
        let iter = view.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.sum::<u64>(), 10);
    }

    #[test]
    fn unaligned_element_offsets_read_correctly() {
        // Write a u32 at byte offset 1, then view it through a byte-offset
        // segment: the unaligned load must reassemble the value.
        let mut block = Block::alloc(8, true);
        block.write::<u8>(1, &0xAABBCCDDu32.to_le_bytes()).unwrap();
        assert_eq!(block.read::<u32>(1).unwrap(), 0xAABBCCDD);
    }

    #[test]
    fn shrink_then_grow_scenario_preserves_and_zeroes() {
        // Allocate 9 u32s, shrink to half-minus-one bytes (4 whole
        // elements survive), then grow: the prefix is preserved and the
        // grown region reads as zero through a view.
        let mut block =
            Block::from_elements::<u32>(&[20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(block.byte_len(), 36);

        block.resize(36 / 2 - 1).unwrap();
        assert_eq!(block.byte_len(), 17);
        assert_eq!(block.view_all::<u32>().unwrap().len(), 4);
        assert_eq!(
            block.view_from::<u32>(1).unwrap().to_vec(),
            vec![30, 40, 50]
        );

        block.resize(17 * 3 + 1).unwrap();
        assert_eq!(block.byte_len(), 52);
        let view = block.view_all::<u32>().unwrap();
        assert_eq!(view.len(), 13);
        let values = view.to_vec();
        assert_eq!(&values[..4], &[20, 30, 40, 50], "prefix lost across grow");
        // Byte 16 — the first byte of the old fifth element (60, little
        // endian) — was inside the preserved 17-byte prefix, so element 4
        // reassembles as 60; everything past it is freshly zeroed.
        assert_eq!(values[4], 60);
        assert!(values[5..].iter().all(|&v| v == 0));

        let tail = block.view_from::<u32>(1).unwrap().to_vec();
        assert_eq!(&tail[..3], &[30, 40, 50]);
        assert_eq!(tail.len(), 12);
    }
}
