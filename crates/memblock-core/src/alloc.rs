//! The raw allocator capability.
//!
//! [`RawAlloc`] is the fixed contract a block consumes for every heap
//! interaction: allocate, free, copy, clear, fill, and resize. It is a
//! compile-time strategy — the block type in the `memblock` crate is
//! generic over it — so tests can substitute a tracking allocator without
//! a `dyn` indirection on the hot path.
//!
//! [`HeapAlloc`] is the production implementation: pure delegation to
//! [`std::alloc`], no business logic. Heap exhaustion is fatal and aborts
//! via [`handle_alloc_error`]; it is never surfaced as a recoverable error.

#![allow(unsafe_code)]

use std::alloc::{self, handle_alloc_error, Layout};
use std::ptr;

/// Fixed alignment for every block allocation, in bytes.
///
/// Matches the strictest alignment of the primitive element types the typed
/// layer supports (16 covers `u128`/`f64x2`-style payloads). A single fixed
/// alignment keeps `free`/`resize` layout reconstruction trivial.
pub const BLOCK_ALIGN: usize = 16;

/// Raw memory operations a block delegates to.
///
/// Implementations are stateless from the block's point of view and must be
/// safe to invoke concurrently from multiple threads for *different*
/// allocations; the block does not serialize calls on the capability.
///
/// # Safety
///
/// Implementors must uphold the documented contract of every method:
/// returned pointers must be valid for reads and writes of the requested
/// size, aligned to [`BLOCK_ALIGN`], and exclusively owned by the caller
/// until passed back to [`free`](RawAlloc::free) or
/// [`resize`](RawAlloc::resize) exactly once.
pub unsafe trait RawAlloc {
    /// Allocate `size` bytes with undefined contents.
    ///
    /// `size == 0` is a valid request and yields a non-null dangling
    /// sentinel without touching the heap. Exhaustion is fatal: this method
    /// never returns null.
    ///
    /// # Safety
    ///
    /// The returned pointer must eventually be released through
    /// [`free`](RawAlloc::free) or [`resize`](RawAlloc::resize) with the
    /// same `size`, exactly once.
    unsafe fn allocate(&self, size: usize) -> *mut u8;

    /// Allocate `size` bytes with every byte set to zero.
    ///
    /// Same contract as [`allocate`](RawAlloc::allocate).
    ///
    /// # Safety
    ///
    /// See [`allocate`](RawAlloc::allocate).
    unsafe fn allocate_zeroed(&self, size: usize) -> *mut u8;

    /// Release an allocation of `size` bytes at `ptr`.
    ///
    /// Releasing the zero-size sentinel is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this capability with exactly this
    /// `size` and not yet freed or resized. Calling twice on the same
    /// allocation is undefined behavior; the block guarantees exactly-once
    /// invocation through its disposal guard.
    unsafe fn free(&self, ptr: *mut u8, size: usize);

    /// Copy `size` bytes from `src` to `dst`.
    ///
    /// The ranges must not overlap. This is the documented resolution of
    /// the contract's implementation-defined overlap point: overlapping
    /// copies are unsupported, and the block's safe API cannot produce
    /// them.
    ///
    /// # Safety
    ///
    /// `src` must be valid for `size` bytes of reads, `dst` for `size`
    /// bytes of writes, and `[src, src+size)` must be disjoint from
    /// `[dst, dst+size)`.
    unsafe fn copy(&self, src: *const u8, dst: *mut u8, size: usize);

    /// Set `size` bytes at `ptr` to zero.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `size` bytes of writes.
    unsafe fn clear(&self, ptr: *mut u8, size: usize);

    /// Set `size` bytes at `ptr` to `value`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `size` bytes of writes.
    unsafe fn fill(&self, ptr: *mut u8, size: usize, value: u8);

    /// Reallocate from `old_size` to `new_size` bytes, preserving contents
    /// up to `min(old_size, new_size)`.
    ///
    /// May return a different address. A grown tail has undefined contents;
    /// the caller zeroes it if needed. Shrinking truncates. Transitions to
    /// or from zero degenerate to [`allocate`](RawAlloc::allocate) /
    /// [`free`](RawAlloc::free).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this capability with size
    /// `old_size` and not yet freed. After the call, `ptr` is invalid and
    /// only the returned pointer (with `new_size`) may be used.
    unsafe fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8;
}

/// The process-heap allocator: delegation to [`std::alloc`].
///
/// A zero-sized strategy type. Every allocation uses the fixed
/// [`BLOCK_ALIGN`] alignment so the layout for `free` and `resize` can be
/// reconstructed from the size alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapAlloc;

impl HeapAlloc {
    /// The sentinel returned for zero-size requests: dangling but non-null
    /// and correctly aligned, never dereferenced and never freed.
    fn dangling() -> *mut u8 {
        BLOCK_ALIGN as *mut u8
    }

    fn layout(size: usize) -> Layout {
        // Sizes come from live allocations or checked capacity arithmetic,
        // so `size` rounded up to the alignment cannot overflow isize.
        Layout::from_size_align(size, BLOCK_ALIGN).expect("block layout")
    }
}

unsafe impl RawAlloc for HeapAlloc {
    unsafe fn allocate(&self, size: usize) -> *mut u8 {
        if size == 0 {
            return Self::dangling();
        }
        let layout = Self::layout(size);
        let ptr = alloc::alloc(layout);
        if ptr.is_null() {
            handle_alloc_error(layout);
        }
        log::trace!("heap: allocated {size} bytes at {ptr:p}");
        ptr
    }

    unsafe fn allocate_zeroed(&self, size: usize) -> *mut u8 {
        if size == 0 {
            return Self::dangling();
        }
        let layout = Self::layout(size);
        let ptr = alloc::alloc_zeroed(layout);
        if ptr.is_null() {
            handle_alloc_error(layout);
        }
        log::trace!("heap: allocated {size} zeroed bytes at {ptr:p}");
        ptr
    }

    unsafe fn free(&self, ptr: *mut u8, size: usize) {
        if size == 0 {
            return;
        }
        log::trace!("heap: freeing {size} bytes at {ptr:p}");
        alloc::dealloc(ptr, Self::layout(size));
    }

    unsafe fn copy(&self, src: *const u8, dst: *mut u8, size: usize) {
        ptr::copy_nonoverlapping(src, dst, size);
    }

    unsafe fn clear(&self, ptr: *mut u8, size: usize) {
        ptr::write_bytes(ptr, 0, size);
    }

    unsafe fn fill(&self, ptr: *mut u8, size: usize, value: u8) {
        ptr::write_bytes(ptr, value, size);
    }

    unsafe fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        if old_size == 0 {
            return self.allocate(new_size);
        }
        if new_size == 0 {
            self.free(ptr, old_size);
            return Self::dangling();
        }
        let layout = Self::layout(old_size);
        let new_ptr = alloc::realloc(ptr, layout, new_size);
        if new_ptr.is_null() {
            handle_alloc_error(Self::layout(new_size));
        }
        if new_ptr != ptr {
            log::trace!("heap: resize {old_size} -> {new_size} relocated {ptr:p} -> {new_ptr:p}");
        }
        new_ptr
    }
}
