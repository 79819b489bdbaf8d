//! SAM to BED conversion (also used for BAM after `samtools view -h`).
//!
//! Column mapping:
//!
//! | BED column | Source |
//! |------------|--------|
//! | 1 chrom    | RNAME (`_unmapped` for unmapped reads) |
//! | 2 start    | POS - 1 |
//! | 3 stop     | start + reference span of CIGAR |
//! | 4 id       | QNAME (`QNAME/k` for block k of a split read) |
//! | 5 score    | FLAG |
//! | 6 strand   | `-` if FLAG & 0x10, else `+` |
//! | 7..13      | MAPQ, CIGAR, RNEXT, PNEXT, TLEN, SEQ, QUAL |
//! | 14..       | optional fields, tab-separated as in the input |

use super::cigar::{decode_into, reference_length, AlignmentBlocks, Block, CigarOp};
use super::header::{HeaderRows, UNMAPPED_CHROM};
use super::LineConverter;
use crate::config::InputFormat;
use crate::error::RecordError;
use crate::streaming::buffers::DEFAULT_FIELD_CAPACITY;
use crate::streaming::output::BedRow;
use crate::streaming::parsing::{parse_u64_fast, FieldOffsets, Fields};

const SAM_MIN_FIELDS: usize = 11;

const QNAME: usize = 0;
const FLAG: usize = 1;
const RNAME: usize = 2;
const POS: usize = 3;
const MAPQ: usize = 4;
const CIGAR: usize = 5;
const QUAL: usize = 10;
const OPTIONAL: usize = 11;

const FLAG_UNMAPPED: u16 = 0x4;
const FLAG_REVERSE: u16 = 0x10;

/// How spliced alignments are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// One row per alignment spanning its whole reference range
    #[default]
    Whole,
    /// One row per block between `N` operations
    Split,
}

impl SplitMode {
    pub fn from_flag(split: bool) -> Self {
        if split {
            SplitMode::Split
        } else {
            SplitMode::Whole
        }
    }
}

/// Streaming SAM converter.
#[derive(Debug)]
pub struct SamConverter {
    mode: SplitMode,
    all_reads: bool,
    keep_header: bool,
    format: InputFormat,
    headers: HeaderRows,
    offsets: FieldOffsets,
    ops: Vec<CigarOp>,
    blocks: Vec<Block>,
}

impl SamConverter {
    pub fn new(mode: SplitMode, keep_header: bool) -> Self {
        Self {
            mode,
            all_reads: false,
            keep_header,
            format: InputFormat::Sam,
            headers: HeaderRows::new(),
            offsets: FieldOffsets::with_capacity(DEFAULT_FIELD_CAPACITY),
            ops: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Keep unmapped reads on the `_unmapped` pseudo-chromosome.
    pub fn with_all_reads(mut self, all_reads: bool) -> Self {
        self.all_reads = all_reads;
        self
    }

    /// Format named in error reports (BAM input arrives as SAM text).
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }
}

impl LineConverter for SamConverter {
    fn convert_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), RecordError> {
        if line.first() == Some(&b'@') {
            if self.keep_header {
                self.headers.push(line, out);
            }
            return Ok(());
        }

        let fields = self.offsets.scan(line);
        if fields.is_blank() {
            return Ok(());
        }
        if fields.len() < SAM_MIN_FIELDS {
            return Err(RecordError::TooFewFields {
                found: fields.len(),
                min: SAM_MIN_FIELDS,
            });
        }

        let flag = parse_u64_fast(fields.get(FLAG))
            .and_then(|f| u16::try_from(f).ok())
            .ok_or_else(|| RecordError::invalid_number("FLAG", fields.get(FLAG)))?;

        if flag & FLAG_UNMAPPED != 0 {
            if self.all_reads {
                write_alignment_row(out, &fields, UNMAPPED_CHROM, 0, 1, None, flag);
            }
            return Ok(());
        }

        let pos = parse_u64_fast(fields.get(POS))
            .ok_or_else(|| RecordError::invalid_number("POS", fields.get(POS)))?;
        if pos == 0 {
            return Err(RecordError::ZeroCoordinate { field: "POS" });
        }
        let start = pos - 1;
        let chrom = fields.get(RNAME);

        decode_into(fields.get(CIGAR), &mut self.ops)?;

        match self.mode {
            SplitMode::Whole => {
                let end = start.checked_add(reference_length(&self.ops)).ok_or(
                    RecordError::CoordinateOverflow {
                        field: "POS",
                        value: pos,
                    },
                )?;
                write_alignment_row(out, &fields, chrom, start, end, None, flag);
            }
            SplitMode::Split => {
                let layout =
                    AlignmentBlocks::split(start, &self.ops, std::mem::take(&mut self.blocks))?;
                if layout.is_split() {
                    for (i, block) in layout.blocks.iter().enumerate() {
                        write_alignment_row(
                            out,
                            &fields,
                            chrom,
                            block.start,
                            block.end,
                            Some(i + 1),
                            flag,
                        );
                    }
                } else {
                    write_alignment_row(out, &fields, chrom, start, layout.end, None, flag);
                }
                self.blocks = layout.into_blocks();
            }
        }
        Ok(())
    }

    fn format(&self) -> InputFormat {
        self.format
    }
}

#[inline]
fn write_alignment_row(
    out: &mut Vec<u8>,
    fields: &Fields<'_>,
    chrom: &[u8],
    start: u64,
    end: u64,
    block: Option<usize>,
    flag: u16,
) {
    let mut row = BedRow::new(out, chrom, start, end);
    match block {
        Some(index) => row.push_block_id(fields.get(QNAME), index),
        None => row.push(fields.get(QNAME)),
    };
    row.push(fields.get(FLAG))
        .push(if flag & FLAG_REVERSE != 0 { b"-" } else { b"+" });
    for idx in MAPQ..=QUAL {
        row.push(fields.get(idx));
    }
    if let Some(optional) = fields.tail(OPTIONAL) {
        row.push(optional);
    }
    row.finish();
}
