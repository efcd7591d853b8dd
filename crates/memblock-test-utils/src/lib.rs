//! Test utilities for memblock development.
//!
//! Provides [`TrackingAlloc`], an instrumented [`RawAlloc`] that delegates
//! to the real process heap while counting every capability call. Tests use
//! it to prove lifecycle invariants that are invisible from the block's
//! public surface: that disposal frees exactly once, that drop releases on
//! every exit path, and that resize chains leak nothing.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use memblock_core::{HeapAlloc, RawAlloc};

/// Counters shared between a [`TrackingAlloc`] and the test observing it.
///
/// All counters include zero-size sentinel calls: the point is to count
/// capability invocations, not heap traffic.
#[derive(Debug, Default)]
pub struct AllocStats {
    allocs: AtomicUsize,
    frees: AtomicUsize,
    resizes: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl AllocStats {
    /// Number of `allocate` / `allocate_zeroed` calls.
    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    /// Number of `free` calls.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Number of `resize` calls.
    pub fn resizes(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }

    /// Bytes currently allocated and not yet freed.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }
}

/// A [`RawAlloc`] that delegates to [`HeapAlloc`] and records every call.
///
/// Cloning shares the same [`AllocStats`], so a test can keep a handle to
/// the stats while moving the allocator into a block.
#[derive(Clone, Debug, Default)]
pub struct TrackingAlloc {
    inner: HeapAlloc,
    stats: Arc<AllocStats>,
}

impl TrackingAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the shared counters.
    pub fn stats(&self) -> Arc<AllocStats> {
        Arc::clone(&self.stats)
    }
}

unsafe impl RawAlloc for TrackingAlloc {
    unsafe fn allocate(&self, size: usize) -> *mut u8 {
        self.stats.allocs.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_add(size, Ordering::SeqCst);
        self.inner.allocate(size)
    }

    unsafe fn allocate_zeroed(&self, size: usize) -> *mut u8 {
        self.stats.allocs.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_add(size, Ordering::SeqCst);
        self.inner.allocate_zeroed(size)
    }

    unsafe fn free(&self, ptr: *mut u8, size: usize) {
        self.stats.frees.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_sub(size, Ordering::SeqCst);
        self.inner.free(ptr, size);
    }

    unsafe fn copy(&self, src: *const u8, dst: *mut u8, size: usize) {
        self.inner.copy(src, dst, size);
    }

    unsafe fn clear(&self, ptr: *mut u8, size: usize) {
        self.inner.clear(ptr, size);
    }

    unsafe fn fill(&self, ptr: *mut u8, size: usize, value: u8) {
        self.inner.fill(ptr, size, value);
    }

    unsafe fn resize(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        self.stats.resizes.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_sub(old_size, Ordering::SeqCst);
        self.stats.live_bytes.fetch_add(new_size, Ordering::SeqCst);
        self.inner.resize(ptr, old_size, new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_counts_alloc_and_free() {
        let alloc = TrackingAlloc::new();
        let stats = alloc.stats();
        unsafe {
            let ptr = alloc.allocate(64);
            assert_eq!(stats.allocs(), 1);
            assert_eq!(stats.live_bytes(), 64);
            alloc.free(ptr, 64);
        }
        assert_eq!(stats.frees(), 1);
        assert_eq!(stats.live_bytes(), 0);
    }

    #[test]
    fn tracking_follows_resize() {
        let alloc = TrackingAlloc::new();
        let stats = alloc.stats();
        unsafe {
            let ptr = alloc.allocate(16);
            let ptr = alloc.resize(ptr, 16, 48);
            assert_eq!(stats.resizes(), 1);
            assert_eq!(stats.live_bytes(), 48);
            alloc.free(ptr, 48);
        }
        assert_eq!(stats.live_bytes(), 0);
    }
}
