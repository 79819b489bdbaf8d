//! Buffered line reassembly.
//!
//! A pipe delivers bytes in reads of arbitrary size that rarely end on a
//! newline. [`LineAssembler`] keeps the incomplete tail of each read at the
//! front of its source buffer, reads the next chunk behind it, and hands
//! every complete line to a [`LineConverter`] exactly once and in order.
//!
//! # Algorithm
//!
//! 1. Read into the source buffer behind the `remainder` bytes carried over.
//! 2. Find the last newline in `remainder + read`; everything after it is
//!    the new remainder.
//! 3. Convert every line before that cut into the destination buffer and
//!    write the destination buffer downstream in one call.
//! 4. Move the remainder to the front of the source buffer.
//!
//! A full buffer without any newline means the record is longer than the
//! buffer, which is fatal.
//!
//! # Memory Complexity
//!
//! O(C) where C is the configured maximum line length; the source buffer
//! never grows.

use crate::convert::LineConverter;
use crate::error::{ConvertError, Result};
use crate::streaming::buffers::dest_buffer_size;
use memchr::{memchr_iter, memrchr};
use std::io::{self, Read, Write};

/// Reassembles lines from a byte stream and feeds them to a converter.
#[derive(Debug)]
pub struct LineAssembler<C> {
    converter: C,
    capacity: usize,
}

impl<C: LineConverter> LineAssembler<C> {
    /// Create an assembler whose source buffer holds `capacity` bytes.
    ///
    /// `capacity` is the longest accepted line including its newline.
    pub fn new(converter: C, capacity: usize) -> Self {
        Self {
            converter,
            capacity: capacity.max(1),
        }
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn into_converter(self) -> C {
        self.converter
    }

    /// Run until `reader` reaches EOF, writing converted rows to `writer`.
    ///
    /// An unterminated final line is converted after EOF like any other.
    pub fn run<R: Read, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<AssemblerStats> {
        let mut stats = AssemblerStats::default();
        let mut src = vec![0u8; self.capacity];
        let mut dest = Vec::with_capacity(dest_buffer_size(self.capacity));
        let mut remainder = 0usize;

        loop {
            // remainder < capacity holds here: a saturated buffer without a
            // newline returns early below.
            let bytes_read = match reader.read(&mut src[remainder..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ConvertError::Io(e)),
            };
            stats.reads += 1;
            stats.bytes_read += bytes_read as u64;

            let filled = remainder + bytes_read;
            let cut = match memrchr(b'\n', &src[..filled]) {
                Some(pos) => pos + 1,
                None if filled == self.capacity => {
                    return Err(ConvertError::LineTooLong {
                        capacity: self.capacity,
                    })
                }
                None => 0,
            };

            dest.clear();
            let mut line_start = 0;
            for newline in memchr_iter(b'\n', &src[..cut]) {
                self.convert(&src[line_start..newline], &mut dest, &mut stats)?;
                line_start = newline + 1;
            }
            if !dest.is_empty() {
                writer.write_all(&dest)?;
                stats.bytes_written += dest.len() as u64;
            }

            src.copy_within(cut..filled, 0);
            remainder = filled - cut;
        }

        if remainder > 0 {
            dest.clear();
            self.convert(&src[..remainder], &mut dest, &mut stats)?;
            if !dest.is_empty() {
                writer.write_all(&dest)?;
                stats.bytes_written += dest.len() as u64;
            }
        }

        writer.flush()?;
        Ok(stats)
    }

    #[inline]
    fn convert(
        &mut self,
        line: &[u8],
        dest: &mut Vec<u8>,
        stats: &mut AssemblerStats,
    ) -> Result<()> {
        stats.lines += 1;
        self.converter
            .convert_line(line, dest)
            .map_err(|source| ConvertError::Malformed {
                format: self.converter.format(),
                line: stats.lines,
                source,
            })
    }
}

/// Counters from one assembler run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Number of successful reads from the source
    pub reads: u64,
    /// Number of lines handed to the converter
    pub lines: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl std::fmt::Display for AssemblerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reads: {}, Lines: {}, Bytes in: {}, Bytes out: {}",
            self.reads, self.lines, self.bytes_read, self.bytes_written
        )
    }
}
