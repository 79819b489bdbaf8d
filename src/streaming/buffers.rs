//! Buffer size constants for streaming stages.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.
//! Every buffer has a fixed upper bound; nothing grows with input size.

/// Default maximum input line length (128 KB).
/// The line assembler's source buffer is exactly this large, so a single
/// record (plus its newline) must fit. Long SAM lines with big optional
/// tag blocks are the usual reason to raise it.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 128 * 1024;

/// Chunk size for verbatim byte-moving stages (64 KB).
/// Matches the default Linux pipe capacity so a single read drains a pipe.
pub const DEFAULT_COPY_BUFFER: usize = 64 * 1024;

/// Initial capacity of a converter's destination buffer (256 KB).
/// One read's worth of converted lines accumulates here before a single
/// downstream write; split SAM records can expand past the source size.
pub const DEFAULT_DEST_BUFFER: usize = 256 * 1024;

/// Initial capacity of the per-line field offsets table.
/// SAM lines with many optional tags are the widest records seen.
pub const DEFAULT_FIELD_CAPACITY: usize = 32;

/// Upper bound on decoded CIGAR operations for one alignment.
pub const MAX_CIGAR_OPS: usize = 65_536;

/// Returns the destination buffer capacity for a given source capacity.
#[inline]
pub const fn dest_buffer_size(source_capacity: usize) -> usize {
    if source_capacity * 2 > DEFAULT_DEST_BUFFER {
        source_capacity * 2
    } else {
        DEFAULT_DEST_BUFFER
    }
}
