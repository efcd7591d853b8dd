//! Element-level typed reads and writes at byte offsets.
//!
//! The scalar counterpart of the view layer: one element in or out per
//! call, addressed by *byte* offset (the view layer uses element offsets).
//! Hard variants fail before any side effect; `try_` variants never fail
//! and report through their return value instead.
//!
//! Writes are deliberately partial: when fewer whole elements fit at the
//! resolved offset than were supplied, the ones that fit are written and
//! the count is returned. Callers wanting all-or-nothing semantics can
//! compare the returned count with the slice length, or go through the
//! stream adapter's `write_all`.

#![allow(unsafe_code)]

use std::mem;
use std::ptr;

use bytemuck::Pod;
use memblock_core::{BlockError, RawAlloc};

use crate::block::Block;
use crate::segment::resolve_segment;

impl<A: RawAlloc> Block<A> {
    /// Read one element of `T` at byte offset `offset`.
    ///
    /// Fails with [`BlockError::Disposed`] after disposal and with
    /// [`BlockError::OutOfRange`] when the resolved segment cannot hold
    /// one whole element.
    pub fn read<T: Pod>(&self, offset: isize) -> Result<T, BlockError> {
        self.ensure_live()?;
        let item_size = mem::size_of::<T>();
        let seg = resolve_segment(self.byte_len(), offset, 1, item_size);
        if seg.is_empty() {
            return Err(BlockError::OutOfRange {
                offset: seg.offset,
                item_size,
                available: self.byte_len() - seg.offset,
            });
        }
        // SAFETY: the resolver guarantees `seg.offset + item_size` is in
        // bounds; the load is unaligned because the offset is arbitrary.
        Ok(unsafe { ptr::read_unaligned(self.base().as_ptr().add(seg.offset).cast::<T>()) })
    }

    /// Read one element of `T` at byte offset `offset`, reporting failure
    /// as `None`.
    ///
    /// Never fails: a disposed block or an empty resolved segment yields
    /// `None` and the block is untouched.
    pub fn try_read<T: Pod>(&self, offset: isize) -> Option<T> {
        self.read(offset).ok()
    }

    /// Write `values` sequentially starting at byte offset `offset`.
    ///
    /// Writes as many whole elements as the resolved segment holds — at
    /// most `values.len()` — and returns the count actually written; a
    /// shorter count than supplied is a silent partial write. Fails with
    /// [`BlockError::Disposed`] after disposal and with
    /// [`BlockError::OutOfRange`] when the resolved segment is empty
    /// (including when `values` itself is empty).
    pub fn write<T: Pod>(&mut self, offset: isize, values: &[T]) -> Result<usize, BlockError> {
        self.ensure_live()?;
        let item_size = mem::size_of::<T>();
        let seg = resolve_segment(self.byte_len(), offset, values.len(), item_size);
        if seg.is_empty() {
            return Err(BlockError::OutOfRange {
                offset: seg.offset,
                item_size,
                available: self.byte_len() - seg.offset,
            });
        }
        let bytes: &[u8] = bytemuck::cast_slice(values);
        // SAFETY: `seg.byte_len <= bytes.len()` by construction and the
        // segment is in bounds; a borrowed slice cannot overlap the
        // exclusively owned block region.
        unsafe {
            self.allocator().copy(
                bytes.as_ptr(),
                self.base().as_ptr().add(seg.offset),
                seg.byte_len,
            );
        }
        Ok(seg.item_count)
    }

    /// Write `values` sequentially at byte offset `offset`, reporting
    /// failure as `None`.
    ///
    /// Never fails; on success performs the same partial-write behavior as
    /// [`Block::write`] and returns the count written.
    pub fn try_write<T: Pod>(&mut self, offset: isize, values: &[T]) -> Option<usize> {
        self.write(offset, values).ok()
    }
}
