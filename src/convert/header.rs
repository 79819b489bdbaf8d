//! Placeholder rows for header and comment lines.
//!
//! With header retention on, every header/comment line becomes one BED row
//! on the `_header` pseudo-chromosome. The interval index increases by one
//! per row, so sorting keeps the original line order.

use crate::streaming::output::BedRow;

/// Pseudo-chromosome for retained header lines.
pub const HEADER_CHROM: &[u8] = b"_header";

/// Pseudo-chromosome for retained unmapped reads.
pub const UNMAPPED_CHROM: &[u8] = b"_unmapped";

/// Counter of header rows emitted by one converter.
#[derive(Debug, Default)]
pub struct HeaderRows {
    next_index: u64,
}

impl HeaderRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `line` into `_header\t{i}\t{i+1}\t{line}`.
    #[inline]
    pub fn push(&mut self, line: &[u8], out: &mut Vec<u8>) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let index = self.next_index;
        let mut row = BedRow::new(out, HEADER_CHROM, index, index + 1);
        row.push(line);
        row.finish();
        self.next_index += 1;
    }

    /// Number of header rows written so far.
    pub fn count(&self) -> u64 {
        self.next_index
    }
}
