//! Block lifecycle and bounds-checked byte operations.
//!
//! A [`Block`] owns exactly one contiguous unmanaged allocation for its
//! whole lifetime. Ownership is never transferred between blocks; the only
//! way to move data between two blocks is an explicit byte copy. Every
//! bounds-checked operation resolves a fresh [`Segment`](crate::Segment)
//! against the block's current length, so bounds stay correct across
//! resizes with no cached range anywhere.
//!
//! # Borrow-checker design
//!
//! The contract's "caller must serialize" rule for shared blocks is
//! enforced statically here: mutations take `&mut self`, reads take
//! `&self`. A view or stream borrowed from the block therefore cannot
//! coexist with a `resize` or `dispose` that would invalidate it. The raw
//! pointer from [`Block::as_ptr`] is the deliberate escape hatch outside
//! that protection.

#![allow(unsafe_code)]

use std::any::Any;
use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use bytemuck::Pod;
use memblock_core::{BlockError, BlockId, HeapAlloc, RawAlloc};

use crate::segment::resolve_segment;

/// A single exclusively owned unmanaged memory allocation plus its
/// metadata.
///
/// Generic over the [`RawAlloc`] capability it delegates to; production
/// code uses the default [`HeapAlloc`], tests inject instrumented
/// allocators through [`Block::alloc_in`].
///
/// Invariant: while not disposed, `[ptr, ptr + len)` is validly
/// addressable and owned by this block and no other. Disposal is
/// idempotent and releases the allocation exactly once, whether it happens
/// through [`Block::dispose`], through `Drop`, or both.
pub struct Block<A: RawAlloc = HeapAlloc> {
    /// Base address. Dangling (never dereferenced) once disposed or when
    /// the block is zero-length.
    ptr: NonNull<u8>,
    /// Current byte length. Reset to 0 on disposal.
    len: usize,
    /// Process-unique id, assigned at construction, never reused.
    id: BlockId,
    /// Opaque user payload; no semantic meaning to the block.
    tag: Option<Box<dyn Any + Send + Sync>>,
    /// Monotonic false→true disposal flag; the swap elects the one caller
    /// that performs the free.
    disposed: AtomicBool,
    /// The allocator capability every heap interaction delegates to.
    alloc: A,
}

// The raw pointer is exclusively owned, so the block moves and shares
// between threads exactly as its allocator and tag allow.
unsafe impl<A: RawAlloc + Send> Send for Block<A> {}
unsafe impl<A: RawAlloc + Sync> Sync for Block<A> {}

impl Block<HeapAlloc> {
    /// Allocate a block of `len` bytes on the process heap.
    ///
    /// `len` of 0 is valid and yields an empty block that still carries an
    /// id and a disposal lifecycle. With `zeroed` the region reads as all
    /// zero; otherwise its contents are undefined until written.
    ///
    /// Heap exhaustion aborts via [`std::alloc::handle_alloc_error`]; it
    /// is not a recoverable error.
    pub fn alloc(len: usize, zeroed: bool) -> Self {
        Self::alloc_in(len, zeroed, HeapAlloc)
    }

    /// Allocate a block initialized from `elements`.
    ///
    /// The block's length is exactly `size_of_val(elements)` and its
    /// contents are a byte copy of the slice.
    pub fn from_elements<T: Pod>(elements: &[T]) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(elements);
        let mut block = Self::alloc(bytes.len(), false);
        if !bytes.is_empty() {
            // SAFETY: the fresh allocation is at least `bytes.len()` long
            // and cannot overlap a live borrowed slice.
            unsafe {
                block
                    .alloc
                    .copy(bytes.as_ptr(), block.ptr.as_ptr(), bytes.len());
            }
        }
        block
    }

    /// Allocate a zeroed block sized to hold `count` elements of `T`.
    ///
    /// Fails with [`BlockError::Overflow`] when `count * size_of::<T>()`
    /// exceeds the address space.
    pub fn with_capacity_of<T: Pod>(count: usize) -> Result<Self, BlockError> {
        let item_size = mem::size_of::<T>();
        let len = item_size
            .checked_mul(count)
            .ok_or(BlockError::Overflow { count, item_size })?;
        Ok(Self::alloc(len, true))
    }
}

impl<A: RawAlloc> Block<A> {
    /// Allocate a block of `len` bytes through the supplied allocator
    /// capability.
    ///
    /// Same semantics as [`Block::alloc`], with the strategy injected at
    /// construction so tests can substitute a tracking or arena allocator.
    pub fn alloc_in(len: usize, zeroed: bool, alloc: A) -> Self {
        // SAFETY: the capability contract guarantees a non-null pointer
        // valid for `len` bytes (or the non-null zero-size sentinel).
        let ptr = unsafe {
            let raw = if zeroed {
                alloc.allocate_zeroed(len)
            } else {
                alloc.allocate(len)
            };
            NonNull::new_unchecked(raw)
        };
        let id = BlockId::next();
        log::trace!("block {id}: allocated {len} bytes");
        Self {
            ptr,
            len,
            id,
            tag: None,
            disposed: AtomicBool::new(false),
            alloc,
        }
    }

    /// The block's process-unique id.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Current length in bytes; 0 once disposed.
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// Whether disposal has completed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Raw base address of the block's memory.
    ///
    /// This is the escape hatch outside the bounds-safety layer: the
    /// pointer is invalidated — with no detection — by `resize` (which may
    /// relocate the region) and by disposal. Unlike the checked
    /// operations, nothing stops a caller from dereferencing it afterwards.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// The user tag, if one is set.
    pub fn tag(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.tag.as_deref()
    }

    /// Attach an arbitrary user payload to the block.
    pub fn set_tag<T: Any + Send + Sync>(&mut self, tag: T) {
        self.tag = Some(Box::new(tag));
    }

    /// Remove and return the user tag.
    pub fn take_tag(&mut self) -> Option<Box<dyn Any + Send + Sync>> {
        self.tag.take()
    }

    /// Fail with [`BlockError::Disposed`] once disposal has completed.
    pub(crate) fn ensure_live(&self) -> Result<(), BlockError> {
        if self.is_disposed() {
            Err(BlockError::Disposed { id: self.id })
        } else {
            Ok(())
        }
    }

    pub(crate) fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Set `len` bytes starting at `offset` to `value`.
    ///
    /// The range is clamped to the block's bounds; the return value is the
    /// number of bytes actually affected, which may be smaller than
    /// requested. Clamping is silent, not a failure.
    pub fn fill(&mut self, offset: isize, len: usize, value: u8) -> Result<usize, BlockError> {
        self.ensure_live()?;
        let seg = resolve_segment(self.len, offset, len, 1);
        if !seg.is_empty() {
            // SAFETY: the resolver guarantees `seg` lies within
            // `[ptr, ptr + self.len)`.
            unsafe {
                self.alloc
                    .fill(self.ptr.as_ptr().add(seg.offset), seg.byte_len, value);
            }
        }
        Ok(seg.byte_len)
    }

    /// Set `len` bytes starting at `offset` to zero.
    ///
    /// Same clamping and return semantics as [`Block::fill`].
    pub fn clear(&mut self, offset: isize, len: usize) -> Result<usize, BlockError> {
        self.ensure_live()?;
        let seg = resolve_segment(self.len, offset, len, 1);
        if !seg.is_empty() {
            // SAFETY: as in `fill`.
            unsafe {
                self.alloc
                    .clear(self.ptr.as_ptr().add(seg.offset), seg.byte_len);
            }
        }
        Ok(seg.byte_len)
    }

    /// Resize the block to `new_len` bytes in place.
    ///
    /// Growing preserves `[0, old_len)` and zero-fills exactly the new
    /// tail `[old_len, new_len)`; shrinking preserves and truncates. The
    /// region may relocate: any raw pointer captured before this call may
    /// now be stale. Views and streams cannot dangle — they borrow the
    /// block and so cannot be live across this call.
    ///
    /// `new_len` of 0 is rejected with [`BlockError::InvalidLength`]
    /// (asymmetric with construction, which allows empty blocks); disposal
    /// is the way to drop to zero.
    pub fn resize(&mut self, new_len: usize) -> Result<(), BlockError> {
        self.ensure_live()?;
        if new_len == 0 {
            return Err(BlockError::InvalidLength { requested: new_len });
        }
        let old_len = self.len;
        // SAFETY: `ptr`/`old_len` describe this block's live allocation;
        // the returned pointer replaces it with `new_len` valid bytes.
        unsafe {
            let raw = self.alloc.resize(self.ptr.as_ptr(), old_len, new_len);
            self.ptr = NonNull::new_unchecked(raw);
            if new_len > old_len {
                self.alloc.clear(raw.add(old_len), new_len - old_len);
            }
        }
        self.len = new_len;
        log::trace!("block {}: resized {old_len} -> {new_len} bytes", self.id);
        Ok(())
    }

    /// Copy up to `len` bytes from this block into `target`.
    ///
    /// Source and destination ranges are clamped independently; the
    /// effective length is the smaller of the two resolved segments and is
    /// returned. A requested `len` of 0 is a no-op returning 0. Fails with
    /// [`BlockError::Disposed`] if either endpoint is disposed.
    pub fn copy_to<B: RawAlloc>(
        &self,
        offset: isize,
        target: &mut Block<B>,
        target_offset: isize,
        len: usize,
    ) -> Result<usize, BlockError> {
        self.ensure_live()?;
        target.ensure_live()?;
        if len == 0 {
            return Ok(0);
        }
        let src = resolve_segment(self.len, offset, len, 1);
        let dst = resolve_segment(target.len, target_offset, len, 1);
        let n = src.byte_len.min(dst.byte_len);
        if n > 0 {
            // SAFETY: both segments are in bounds of their blocks, and two
            // distinct live blocks never share an allocation, so the
            // ranges cannot overlap.
            unsafe {
                self.alloc.copy(
                    self.ptr.as_ptr().add(src.offset),
                    target.ptr.as_ptr().add(dst.offset),
                    n,
                );
            }
        }
        Ok(n)
    }

    /// Copy up to `len` bytes from `source` into this block.
    ///
    /// Mirror of [`Block::copy_to`] with the same clamping, no-op, and
    /// disposal semantics.
    pub fn copy_from<B: RawAlloc>(
        &mut self,
        offset: isize,
        source: &Block<B>,
        source_offset: isize,
        len: usize,
    ) -> Result<usize, BlockError> {
        source.copy_to(source_offset, self, offset, len)
    }

    /// Copy this block's whole contents into `target`.
    ///
    /// Convenience for `copy_to(0, target, 0, self.byte_len())`; the
    /// effective length is clamped to the smaller block.
    pub fn copy_all_to<B: RawAlloc>(&self, target: &mut Block<B>) -> Result<usize, BlockError> {
        self.copy_to(0, target, 0, self.len)
    }

    /// Copy up to `len` bytes starting at `offset` to a raw external
    /// address.
    ///
    /// The block side is clamped as usual; `dst` carries no bounds
    /// information and is trusted as-is. A null `dst` fails with
    /// [`BlockError::NullPointer`].
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of the returned number of bytes and
    /// must not overlap this block's region.
    pub unsafe fn copy_to_raw(
        &self,
        offset: isize,
        dst: *mut u8,
        len: usize,
    ) -> Result<usize, BlockError> {
        if dst.is_null() {
            return Err(BlockError::NullPointer);
        }
        self.ensure_live()?;
        if len == 0 {
            return Ok(0);
        }
        let src = resolve_segment(self.len, offset, len, 1);
        if !src.is_empty() {
            self.alloc
                .copy(self.ptr.as_ptr().add(src.offset), dst, src.byte_len);
        }
        Ok(src.byte_len)
    }

    /// Copy up to `len` bytes from a raw external address into this block
    /// starting at `offset`.
    ///
    /// Mirror of [`Block::copy_to_raw`]: the block side is clamped, `src`
    /// is trusted, null fails with [`BlockError::NullPointer`].
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of the returned number of bytes and
    /// must not overlap this block's region.
    pub unsafe fn copy_from_raw(
        &mut self,
        offset: isize,
        src: *const u8,
        len: usize,
    ) -> Result<usize, BlockError> {
        if src.is_null() {
            return Err(BlockError::NullPointer);
        }
        self.ensure_live()?;
        if len == 0 {
            return Ok(0);
        }
        let dst = resolve_segment(self.len, offset, len, 1);
        if !dst.is_empty() {
            self.alloc
                .copy(src, self.ptr.as_ptr().add(dst.offset), dst.byte_len);
        }
        Ok(dst.byte_len)
    }

    /// Release the block's allocation.
    ///
    /// Idempotent: the first call (or `Drop`, whichever comes first)
    /// performs the free; every later call is a no-op. After disposal the
    /// length reads as 0, the tag is cleared, and every bounds-checked
    /// operation fails with [`BlockError::Disposed`]. That failure is a
    /// safety net distinct from [`Block::as_ptr`], which remains genuinely
    /// unsafe if a captured pointer is used after this point.
    pub fn dispose(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        // First caller wins; the swap makes the free exactly-once even
        // when an explicit dispose later runs into Drop.
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        log::trace!("block {}: disposing {} bytes", self.id, self.len);
        // SAFETY: the guard above guarantees this is the only release of
        // this allocation.
        unsafe {
            self.alloc.free(self.ptr.as_ptr(), self.len);
        }
        self.ptr = NonNull::dangling();
        self.len = 0;
        self.tag = None;
    }
}

impl<A: RawAlloc> Drop for Block<A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<A: RawAlloc> fmt::Debug for Block<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("len", &self.len)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
