//! Efficient BED row formatting into a destination buffer.
//!
//! Uses itoa for integer formatting to avoid allocation in the hot path.
//! Rows are appended to a caller-owned `Vec<u8>` that the line assembler
//! writes downstream in one call per read.

/// Builder for one tab-delimited, newline-terminated BED row.
///
/// The first three columns are always chromosome, start and stop; every
/// further push adds one column. The row is only complete after
/// [`BedRow::finish`].
pub struct BedRow<'a> {
    out: &'a mut Vec<u8>,
    itoa_buf: itoa::Buffer,
}

impl<'a> BedRow<'a> {
    /// Start a row with its BED3 prefix.
    #[inline]
    pub fn new(out: &'a mut Vec<u8>, chrom: &[u8], start: u64, end: u64) -> Self {
        let mut row = Self {
            out,
            itoa_buf: itoa::Buffer::new(),
        };
        row.out.extend_from_slice(chrom);
        row.push_int(start);
        row.push_int(end);
        row
    }

    /// Append a column copied verbatim.
    #[inline]
    pub fn push(&mut self, field: &[u8]) -> &mut Self {
        self.out.push(b'\t');
        self.out.extend_from_slice(field);
        self
    }

    /// Append an integer column.
    #[inline]
    pub fn push_int<I: itoa::Integer>(&mut self, n: I) -> &mut Self {
        self.out.push(b'\t');
        self.out.extend_from_slice(self.itoa_buf.format(n).as_bytes());
        self
    }

    /// Append a column made of two adjacent parts (e.g. `qname` + `/2`).
    #[inline]
    pub fn push_joined(&mut self, head: &[u8], tail: &[u8]) -> &mut Self {
        self.out.push(b'\t');
        self.out.extend_from_slice(head);
        self.out.extend_from_slice(tail);
        self
    }

    /// Append `name/index`, the id of one block of a split alignment.
    #[inline]
    pub fn push_block_id(&mut self, name: &[u8], index: usize) -> &mut Self {
        self.out.push(b'\t');
        self.out.extend_from_slice(name);
        self.out.push(b'/');
        self.out
            .extend_from_slice(self.itoa_buf.format(index).as_bytes());
        self
    }

    /// Terminate the row.
    #[inline]
    pub fn finish(self) {
        self.out.push(b'\n');
    }
}
