//! Allocator capability, block ids, and error types for memblock.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! fixed contract between a block and the raw heap ([`RawAlloc`]), the
//! production process-heap implementation ([`HeapAlloc`]), process-unique
//! block identifiers ([`BlockId`]), and the error taxonomy ([`BlockError`]).
//!
//! This crate is one of two that may contain `unsafe` code (along with
//! `memblock` itself); all of it lives in the [`alloc`] module.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod alloc;
pub mod error;
pub mod id;

// Public re-exports for the primary API surface.
pub use alloc::{HeapAlloc, RawAlloc, BLOCK_ALIGN};
pub use error::BlockError;
pub use id::BlockId;
