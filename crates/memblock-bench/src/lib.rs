//! Shared helpers for memblock benchmarks.

#![deny(rustdoc::broken_intra_doc_links)]

use memblock::Block;

/// Build a block holding `count` sequential `u32` values.
pub fn sequential_block(count: usize) -> Block {
    let values: Vec<u32> = (0..count as u32).collect();
    Block::from_elements(&values)
}
