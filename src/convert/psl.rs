//! PSL to BED conversion.
//!
//! The target side of the alignment becomes the interval:
//! `tName, tStart, tEnd, qName, qSize, strand`, followed by the remaining
//! fifteen PSL columns in this order: matches, misMatches, repMatches,
//! nCount, qNumInsert, qBaseInsert, tNumInsert, tBaseInsert, qStart, qEnd,
//! tSize, blockCount, blockSizes, qStarts, tStarts.
//!
//! PSL coordinates are already 0-based half-open, so no shift is applied.

use super::header::HeaderRows;
use super::LineConverter;
use crate::config::InputFormat;
use crate::error::RecordError;
use crate::streaming::buffers::DEFAULT_FIELD_CAPACITY;
use crate::streaming::output::BedRow;
use crate::streaming::parsing::{parse_u64_fast, FieldOffsets};

const PSL_FIELDS: usize = 21;

/// Lines in the `psLayout version 3` banner.
pub const PSL_BANNER_LINES: u64 = 5;

// Field indices
const MATCHES: usize = 0;
const T_BASE_INSERT: usize = 7;
const STRAND: usize = 8;
const Q_NAME: usize = 9;
const Q_SIZE: usize = 10;
const Q_START: usize = 11;
const Q_END: usize = 12;
const T_NAME: usize = 13;
const T_SIZE: usize = 14;
const T_START: usize = 15;
const T_END: usize = 16;
const BLOCK_COUNT: usize = 17;

/// Streaming PSL converter.
#[derive(Debug)]
pub struct PslConverter {
    keep_header: bool,
    headered: bool,
    lines_seen: u64,
    headers: HeaderRows,
    offsets: FieldOffsets,
}

impl PslConverter {
    pub fn new(keep_header: bool, headered: bool) -> Self {
        Self {
            keep_header,
            headered,
            lines_seen: 0,
            headers: HeaderRows::new(),
            offsets: FieldOffsets::with_capacity(DEFAULT_FIELD_CAPACITY),
        }
    }
}

impl LineConverter for PslConverter {
    fn convert_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), RecordError> {
        self.lines_seen += 1;
        let in_banner = self.lines_seen <= PSL_BANNER_LINES;
        if in_banner && self.headered {
            if self.keep_header {
                self.headers.push(line, out);
            }
            return Ok(());
        }

        let fields = self.offsets.scan(line);
        if fields.len() != PSL_FIELDS {
            if fields.is_blank() {
                return Ok(());
            }
            if in_banner {
                return Err(RecordError::UnexpectedBanner {
                    found: fields.len(),
                });
            }
            return Err(RecordError::FieldCount {
                found: fields.len(),
                min: PSL_FIELDS,
                max: PSL_FIELDS,
            });
        }

        let t_start = parse_u64_fast(fields.get(T_START))
            .ok_or_else(|| RecordError::invalid_number("tStart", fields.get(T_START)))?;
        let t_end = parse_u64_fast(fields.get(T_END))
            .ok_or_else(|| RecordError::invalid_number("tEnd", fields.get(T_END)))?;
        if t_start > t_end {
            return Err(RecordError::InvertedInterval {
                start: t_start,
                end: t_end,
            });
        }
        let q_size = parse_u64_fast(fields.get(Q_SIZE))
            .ok_or_else(|| RecordError::invalid_number("qSize", fields.get(Q_SIZE)))?;

        let mut row = BedRow::new(out, fields.get(T_NAME), t_start, t_end);
        row.push(fields.get(Q_NAME))
            .push_int(q_size)
            .push(fields.get(STRAND));
        for idx in MATCHES..=T_BASE_INSERT {
            row.push(fields.get(idx));
        }
        row.push(fields.get(Q_START))
            .push(fields.get(Q_END))
            .push(fields.get(T_SIZE));
        for idx in BLOCK_COUNT..PSL_FIELDS {
            row.push(fields.get(idx));
        }
        row.finish();
        Ok(())
    }

    fn format(&self) -> InputFormat {
        InputFormat::Psl
    }
}
