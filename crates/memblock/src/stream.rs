//! A block's bytes as a seekable, fixed-length byte stream.
//!
//! [`BlockStream`] adapts a block for stream-oriented consumers through
//! the standard [`io::Read`], [`io::Write`], and [`io::Seek`] traits. The
//! stream borrows the block mutably for its whole lifetime, so the
//! contract's hazard — resizing or disposing a block while a stream
//! derived from it is open — is a compile error here rather than a
//! documented invalidation.

#![allow(unsafe_code)]

use std::io::{self, Read, Seek, SeekFrom, Write};

use memblock_core::RawAlloc;

use crate::block::Block;

/// Access requested when opening a stream over a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    /// Reads only; writes fail with [`io::ErrorKind::PermissionDenied`].
    Read,
    /// Writes only; reads fail with [`io::ErrorKind::PermissionDenied`].
    Write,
    /// Both reads and writes.
    ReadWrite,
}

impl AccessMode {
    fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// A seekable, fixed-length byte stream over a block's current contents.
///
/// The length is fixed at the block's length: reading at the end returns
/// 0 bytes, and writing past the end writes only what fits (`write_all`
/// then surfaces [`io::ErrorKind::WriteZero`]). The cursor may be seeked
/// past the end; reads there return 0 and writes 0 bytes.
#[derive(Debug)]
pub struct BlockStream<'a, A: RawAlloc = memblock_core::HeapAlloc> {
    block: &'a mut Block<A>,
    pos: u64,
    mode: AccessMode,
}

impl<A: RawAlloc> Block<A> {
    /// Open a stream over the block's bytes in the requested access mode.
    ///
    /// Fails with [`BlockError`](memblock_core::BlockError) `::Disposed`
    /// after disposal. The stream holds the exclusive borrow until
    /// dropped.
    pub fn stream(
        &mut self,
        mode: AccessMode,
    ) -> Result<BlockStream<'_, A>, memblock_core::BlockError> {
        self.ensure_live()?;
        Ok(BlockStream {
            block: self,
            pos: 0,
            mode,
        })
    }
}

impl<A: RawAlloc> BlockStream<'_, A> {
    /// Current cursor position in bytes.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total stream length in bytes: the block's length.
    pub fn len(&self) -> u64 {
        self.block.byte_len() as u64
    }

    /// Whether the underlying block is empty.
    pub fn is_empty(&self) -> bool {
        self.block.byte_len() == 0
    }

    /// The access mode the stream was opened with.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl<A: RawAlloc> Read for BlockStream<'_, A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.mode.can_read() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "block stream not opened for reading",
            ));
        }
        let len = self.len();
        if self.pos >= len {
            return Ok(0);
        }
        let n = buf.len().min((len - self.pos) as usize);
        // SAFETY: `buf` is a live mutable slice, disjoint from the block's
        // region; the offset is below the block length.
        let copied = unsafe {
            self.block
                .copy_to_raw(self.pos as isize, buf.as_mut_ptr(), n)
        }
        .map_err(io::Error::other)?;
        self.pos += copied as u64;
        Ok(copied)
    }
}

impl<A: RawAlloc> Write for BlockStream<'_, A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.mode.can_write() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "block stream not opened for writing",
            ));
        }
        let len = self.len();
        if self.pos >= len || buf.is_empty() {
            // Fixed-length stream: no growth past the end.
            return Ok(0);
        }
        let n = buf.len().min((len - self.pos) as usize);
        // SAFETY: `buf` is a live slice, disjoint from the block's region;
        // the offset is below the block length.
        let copied = unsafe { self.block.copy_from_raw(self.pos as isize, buf.as_ptr(), n) }
            .map_err(io::Error::other)?;
        self.pos += copied as u64;
        Ok(copied)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Writes land in memory immediately; nothing is buffered.
        Ok(())
    }
}

impl<A: RawAlloc> Seek for BlockStream<'_, A> {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let target = match from {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(delta) => i128::from(self.len()) + i128::from(delta),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
        };
        if target < 0 || target > i128::from(u64::MAX) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a position outside the representable range",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_through_seek() {
        let mut block = Block::alloc(16, true);
        let mut stream = block.stream(AccessMode::ReadWrite).unwrap();

        stream.write_all(b"hello block").unwrap();
        assert_eq!(stream.position(), 11);

        stream.seek(SeekFrom::Start(0)).unwrap();
        let mut out = [0u8; 11];
        stream.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"hello block");
    }

    #[test]
    fn read_mode_rejects_writes() {
        let mut block = Block::alloc(8, true);
        let mut stream = block.stream(AccessMode::Read).unwrap();
        let err = stream.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn write_mode_rejects_reads() {
        let mut block = Block::alloc(8, true);
        let mut stream = block.stream(AccessMode::Write).unwrap();
        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn stream_length_is_fixed_at_the_block_length() {
        let mut block = Block::alloc(4, true);
        let mut stream = block.stream(AccessMode::ReadWrite).unwrap();

        // Only 4 of 8 bytes fit; the rest is refused, not grown into.
        assert_eq!(stream.write(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(), 4);
        assert_eq!(stream.write(&[9]).unwrap(), 0);
        assert!(matches!(
            stream.write_all(&[9]).unwrap_err().kind(),
            io::ErrorKind::WriteZero
        ));
    }

    #[test]
    fn reading_at_the_end_returns_zero_bytes() {
        let mut block = Block::alloc(4, true);
        let mut stream = block.stream(AccessMode::Read).unwrap();
        stream.seek(SeekFrom::End(0)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn seeking_past_the_end_is_allowed() {
        let mut block = Block::alloc(4, true);
        let mut stream = block.stream(AccessMode::ReadWrite).unwrap();
        assert_eq!(stream.seek(SeekFrom::Start(100)).unwrap(), 100);
        let mut buf = [0u8; 1];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert_eq!(stream.write(&[1]).unwrap(), 0);
    }

    #[test]
    fn seeking_before_the_start_is_an_error() {
        let mut block = Block::alloc(4, true);
        let mut stream = block.stream(AccessMode::Read).unwrap();
        let err = stream.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = stream.seek(SeekFrom::End(-5)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn relative_seeks_compose() {
        let mut block = Block::from_elements::<u8>(&[10, 20, 30, 40, 50]);
        let mut stream = block.stream(AccessMode::Read).unwrap();
        stream.seek(SeekFrom::Start(4)).unwrap();
        stream.seek(SeekFrom::Current(-2)).unwrap();
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 30);
    }

    #[test]
    fn disposed_block_cannot_open_a_stream() {
        let mut block = Block::alloc(4, true);
        block.dispose();
        assert!(block.stream(AccessMode::Read).is_err());
    }
}
