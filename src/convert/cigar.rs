//! CIGAR decoding and alignment block splitting.
//!
//! A CIGAR string such as `10M5N10M` is decoded into `(kind, len)` pairs.
//! The reference span of an alignment is the sum of the reference-consuming
//! operations; in split mode the alignment is further cut at every `N`
//! (intron skip) into disjoint blocks.
//!
//! # Splitting rules
//!
//! Walking the operations with a reference cursor:
//! - `M`, `=`, `X` extend the current block
//! - `D` advances the cursor inside the current block (deletions do not split)
//! - `N` closes the current block (if non-empty) and advances the cursor
//! - `I`, `S`, `H`, `P` do not move the cursor
//!
//! An alignment without any `N` is a single block covering the whole span.

use crate::error::RecordError;
use crate::streaming::buffers::MAX_CIGAR_OPS;

/// One CIGAR operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
    Skip,
    SoftClip,
    HardClip,
    Padding,
    SeqMatch,
    SeqMismatch,
}

impl CigarKind {
    #[inline]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'M' => Some(CigarKind::Match),
            b'I' => Some(CigarKind::Insertion),
            b'D' => Some(CigarKind::Deletion),
            b'N' => Some(CigarKind::Skip),
            b'S' => Some(CigarKind::SoftClip),
            b'H' => Some(CigarKind::HardClip),
            b'P' => Some(CigarKind::Padding),
            b'=' => Some(CigarKind::SeqMatch),
            b'X' => Some(CigarKind::SeqMismatch),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            CigarKind::Match => b'M',
            CigarKind::Insertion => b'I',
            CigarKind::Deletion => b'D',
            CigarKind::Skip => b'N',
            CigarKind::SoftClip => b'S',
            CigarKind::HardClip => b'H',
            CigarKind::Padding => b'P',
            CigarKind::SeqMatch => b'=',
            CigarKind::SeqMismatch => b'X',
        }
    }

    /// Whether the operation advances the reference coordinate.
    #[inline]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarKind::Match
                | CigarKind::Deletion
                | CigarKind::Skip
                | CigarKind::SeqMatch
                | CigarKind::SeqMismatch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Decode `cigar` into `ops`, replacing its previous contents.
///
/// A `*` ends decoding; `*` alone (CIGAR unavailable) yields no operations.
pub fn decode_into(cigar: &[u8], ops: &mut Vec<CigarOp>) -> Result<(), RecordError> {
    ops.clear();
    let invalid = || RecordError::InvalidCigar(String::from_utf8_lossy(cigar).into_owned());

    let mut count: Option<u32> = None;
    for &b in cigar {
        if b.is_ascii_digit() {
            let digit = (b - b'0') as u32;
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(invalid)?;
            count = Some(next);
            continue;
        }
        if b == b'*' {
            break;
        }
        let kind = CigarKind::from_byte(b).ok_or_else(invalid)?;
        let len = count.take().ok_or_else(invalid)?;
        if ops.len() == MAX_CIGAR_OPS {
            return Err(RecordError::CigarTooLong(MAX_CIGAR_OPS));
        }
        ops.push(CigarOp::new(kind, len));
    }
    if count.is_some() {
        return Err(invalid());
    }
    Ok(())
}

/// Bases of reference covered by the alignment.
#[inline]
pub fn reference_length(ops: &[CigarOp]) -> u64 {
    ops.iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len as u64)
        .sum()
}

/// A half-open reference interval produced by splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start: u64,
    pub end: u64,
}

/// Result of walking an alignment's operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentBlocks {
    pub blocks: Vec<Block>,
    /// End of the whole alignment (start + reference length)
    pub end: u64,
    /// At least one `N` operation was seen
    pub spliced: bool,
}

impl AlignmentBlocks {
    /// Walk `ops` from reference position `start`, reusing `blocks`.
    ///
    /// Fails when the walk moves past `u64::MAX`.
    pub fn split(
        start: u64,
        ops: &[CigarOp],
        mut blocks: Vec<Block>,
    ) -> Result<Self, RecordError> {
        blocks.clear();
        let overflow = || RecordError::CoordinateOverflow {
            field: "POS",
            value: start.saturating_add(1),
        };
        let mut cursor = start;
        let mut block_start = start;
        let mut spliced = false;

        for op in ops {
            let len = op.len as u64;
            match op.kind {
                CigarKind::Skip => {
                    spliced = true;
                    if cursor > block_start {
                        blocks.push(Block {
                            start: block_start,
                            end: cursor,
                        });
                    }
                    cursor = cursor.checked_add(len).ok_or_else(overflow)?;
                    block_start = cursor;
                }
                kind if kind.consumes_reference() => {
                    cursor = cursor.checked_add(len).ok_or_else(overflow)?;
                }
                _ => {}
            }
        }
        if cursor > block_start {
            blocks.push(Block {
                start: block_start,
                end: cursor,
            });
        }

        Ok(Self {
            blocks,
            end: cursor,
            spliced,
        })
    }

    /// True when the alignment must be written as separate `qname/k` rows.
    #[inline]
    pub fn is_split(&self) -> bool {
        self.spliced && !self.blocks.is_empty()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}
