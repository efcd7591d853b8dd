//! A bounds-checked unmanaged memory block with typed views and stream
//! adaptation.
//!
//! The crate provides a single-allocation primitive for interop and
//! buffer-management code — image and audio buffers, native API
//! marshaling — that needs unmanaged storage without hand-rolled pointer
//! arithmetic at every call site.
//!
//! # Architecture
//!
//! ```text
//! Block (lifecycle: alloc / resize / dispose-exactly-once)
//! ├── resolve_segment (pure clamping: (offset, count) -> in-bounds Segment)
//! ├── byte ops (fill / clear / copy_to / copy_from / raw copies)
//! ├── View / ViewMut     (zero-copy typed reinterpretation, element offsets)
//! ├── read / write       (scalar typed access, byte offsets)
//! └── BlockStream        (std::io::{Read, Write, Seek} over the bytes)
//! ```
//!
//! Every bounds-checked operation re-resolves its range against the
//! block's *current* length through [`resolve_segment`], the one algorithm
//! all of them share; nothing caches a range across calls. The raw
//! allocator behind the block is the [`RawAlloc`] capability from
//! `memblock-core`, injected at construction so tests can substitute an
//! instrumented allocator.
//!
//! This crate is one of two that may contain `unsafe` code (along with
//! `memblock-core`). The resolver itself is safe; the unsafe is confined
//! to the block's delegation into the capability and the view and scalar
//! accessors consuming already-resolved segments.
//!
//! # Example
//!
//! ```
//! use memblock::Block;
//!
//! let mut block = Block::with_capacity_of::<u32>(3)?;
//! block.write::<u32>(0, &[20, 30, 40])?;
//! assert_eq!(block.read::<u32>(4)?, 30);
//! assert_eq!(block.view_from::<u32>(1)?.to_vec(), vec![30, 40]);
//! block.dispose();
//! assert!(block.read::<u32>(0).is_err());
//! # Ok::<(), memblock::BlockError>(())
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod block;
pub mod rw;
pub mod segment;
pub mod stream;
pub mod view;

// Public re-exports for the primary API surface.
pub use block::Block;
pub use memblock_core::{BlockError, BlockId, HeapAlloc, RawAlloc, BLOCK_ALIGN};
pub use segment::{resolve_segment, Segment};
pub use stream::{AccessMode, BlockStream};
pub use view::{View, ViewIter, ViewMut};
