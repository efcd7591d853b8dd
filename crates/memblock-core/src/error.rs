//! Error types for block operations.
//!
//! Every recoverable failure in the workspace is a [`BlockError`]. Heap
//! exhaustion is deliberately absent: the allocator treats it as fatal and
//! aborts via [`std::alloc::handle_alloc_error`] rather than surfacing a
//! recoverable error kind.

use std::error::Error;
use std::fmt;

use crate::id::BlockId;

/// Errors from block addressing and lifecycle operations.
///
/// Hard entry points fail with one of these before any side effect occurs;
/// `try_*` variants never return an error and leave the block's observable
/// state unchanged instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockError {
    /// A resize to zero bytes was requested. Resizing rejects zero and a
    /// block length is unsigned, so zero is the only invalid length.
    InvalidLength {
        /// The rejected length in bytes.
        requested: usize,
    },
    /// A raw-pointer copy endpoint was null.
    NullPointer,
    /// An addressing or mutating operation reached a block after its
    /// disposal completed.
    Disposed {
        /// Id of the disposed block.
        id: BlockId,
    },
    /// A single-element read or write found a resolved segment too small to
    /// hold one whole element.
    OutOfRange {
        /// The requested byte offset after clamping.
        offset: usize,
        /// Size of one element in bytes.
        item_size: usize,
        /// Bytes available at the resolved offset.
        available: usize,
    },
    /// Capacity arithmetic (`count * item_size`) overflowed the address
    /// space.
    Overflow {
        /// The requested element count.
        count: usize,
        /// Size of one element in bytes.
        item_size: usize,
    },
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { requested } => {
                write!(f, "invalid block length: {requested} bytes")
            }
            Self::NullPointer => write!(f, "null raw pointer passed to a copy operation"),
            Self::Disposed { id } => write!(f, "block {id} has been disposed"),
            Self::OutOfRange {
                offset,
                item_size,
                available,
            } => {
                write!(
                    f,
                    "segment at offset {offset} holds {available} bytes, \
                     need {item_size} for one element"
                )
            }
            Self::Overflow { count, item_size } => {
                write!(
                    f,
                    "capacity overflow: {count} elements of {item_size} bytes"
                )
            }
        }
    }
}

impl Error for BlockError {}
