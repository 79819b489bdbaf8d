//! Per-format line converters.
//!
//! Each converter maps one input line to zero or more BED rows appended to a
//! destination buffer. Converters keep only per-stage state (header row
//! counter, PSL line counter, reusable scratch tables); everything derived
//! from a record (IDs, CIGAR operations, coordinates) lives for one call.
//!
//! | Format | chrom | start | stop | id | score | strand |
//! |--------|-------|-------|------|----|-------|--------|
//! | GFF    | seqid | start-1 | end | `ID=` | score | strand |
//! | GTF    | seqname | start-1 | end | `gene_id` | score | strand |
//! | PSL    | tName | tStart | tEnd | qName | qSize | strand |
//! | SAM    | RNAME | POS-1 | POS-1+ref span | QNAME | FLAG | FLAG & 0x10 |

pub mod cigar;
pub mod gff;
pub mod gtf;
pub mod header;
pub mod psl;
pub mod sam;

pub use cigar::{AlignmentBlocks, Block, CigarKind, CigarOp};
pub use gff::GffConverter;
pub use gtf::GtfConverter;
pub use header::{HeaderRows, HEADER_CHROM, UNMAPPED_CHROM};
pub use psl::PslConverter;
pub use sam::{SamConverter, SplitMode};

use crate::config::{ConversionConfig, InputFormat};
use crate::error::RecordError;
use crate::streaming::parsing::parse_u64_fast;

/// One line in, zero or more BED rows out.
pub trait LineConverter {
    /// Convert `line` (without its newline) and append the produced rows,
    /// each newline-terminated, to `out`.
    ///
    /// On error `out` may hold a partial row; the run is aborted anyway.
    fn convert_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), RecordError>;

    /// Input format handled by this converter, for error reports.
    fn format(&self) -> InputFormat;
}

/// The converter selected for a run.
///
/// Chosen once at pipeline-build time from the input format; BAM input is
/// decoded to SAM text upstream and uses the SAM converter.
#[derive(Debug)]
pub enum Converter {
    Gff(GffConverter),
    Gtf(GtfConverter),
    Psl(PslConverter),
    Sam(SamConverter),
}

impl Converter {
    pub fn for_config(config: &ConversionConfig) -> Self {
        match config.input_format {
            InputFormat::Gff => Converter::Gff(GffConverter::new(config.keep_header)),
            InputFormat::Gtf => Converter::Gtf(GtfConverter::new(config.keep_header)),
            InputFormat::Psl => {
                Converter::Psl(PslConverter::new(config.keep_header, config.headered))
            }
            InputFormat::Bam | InputFormat::Sam => Converter::Sam(
                SamConverter::new(SplitMode::from_flag(config.split), config.keep_header)
                    .with_all_reads(config.all_reads)
                    .with_format(config.input_format),
            ),
        }
    }

    /// Short name used for logging and thread names.
    pub fn name(&self) -> &'static str {
        match self {
            Converter::Gff(_) => "gff",
            Converter::Gtf(_) => "gtf",
            Converter::Psl(_) => "psl",
            Converter::Sam(sam) => match sam.mode() {
                SplitMode::Split => "sam-split",
                SplitMode::Whole => "sam",
            },
        }
    }
}

impl LineConverter for Converter {
    #[inline]
    fn convert_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), RecordError> {
        match self {
            Converter::Gff(c) => c.convert_line(line, out),
            Converter::Gtf(c) => c.convert_line(line, out),
            Converter::Psl(c) => c.convert_line(line, out),
            Converter::Sam(c) => c.convert_line(line, out),
        }
    }

    fn format(&self) -> InputFormat {
        match self {
            Converter::Gff(c) => c.format(),
            Converter::Gtf(c) => c.format(),
            Converter::Psl(c) => c.format(),
            Converter::Sam(c) => c.format(),
        }
    }
}

/// A GFF/GTF feature interval converted to half-open coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FeatureInterval {
    pub start: u64,
    pub end: u64,
    /// Source feature had `start == end`
    pub zero_length: bool,
}

impl FeatureInterval {
    /// Convert 1-based closed `[start, end]` into `[start-1, end)`.
    pub(crate) fn from_closed(start: &[u8], end: &[u8]) -> Result<Self, RecordError> {
        let start_val =
            parse_u64_fast(start).ok_or_else(|| RecordError::invalid_number("start", start))?;
        let end_val = parse_u64_fast(end).ok_or_else(|| RecordError::invalid_number("end", end))?;
        if start_val == 0 {
            return Err(RecordError::ZeroCoordinate { field: "start" });
        }
        if start_val > end_val {
            return Err(RecordError::InvertedInterval {
                start: start_val,
                end: end_val,
            });
        }
        Ok(Self {
            start: start_val - 1,
            end: end_val,
            zero_length: start_val == end_val,
        })
    }
}

/// Written in the id column when a feature carries no usable identifier.
pub(crate) const MISSING_ID: &[u8] = b".";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_interval() {
        let iv = FeatureInterval::from_closed(b"100", b"200").unwrap();
        assert_eq!((iv.start, iv.end, iv.zero_length), (99, 200, false));

        let iv = FeatureInterval::from_closed(b"150", b"150").unwrap();
        assert_eq!((iv.start, iv.end, iv.zero_length), (149, 150, true));
    }

    #[test]
    fn test_feature_interval_errors() {
        assert_eq!(
            FeatureInterval::from_closed(b"0", b"10"),
            Err(RecordError::ZeroCoordinate { field: "start" })
        );
        assert_eq!(
            FeatureInterval::from_closed(b"20", b"10"),
            Err(RecordError::InvertedInterval { start: 20, end: 10 })
        );
        assert!(matches!(
            FeatureInterval::from_closed(b"x", b"10"),
            Err(RecordError::InvalidNumber { field: "start", .. })
        ));
    }

    #[test]
    fn test_converter_selection() {
        let config = ConversionConfig::new(InputFormat::Bam).with_split(true);
        let converter = Converter::for_config(&config);
        assert_eq!(converter.name(), "sam-split");
        assert_eq!(converter.format(), InputFormat::Bam);

        let config = ConversionConfig::new(InputFormat::Gtf);
        assert_eq!(Converter::for_config(&config).name(), "gtf");
    }

    #[test]
    fn test_dispatch_converts() {
        let config = ConversionConfig::new(InputFormat::Gff);
        let mut converter = Converter::for_config(&config);
        let mut out = Vec::new();
        converter
            .convert_line(b"chr1\tsrc\tgene\t1\t10\t.\t+\t.\tID=g1", &mut out)
            .unwrap();
        assert_eq!(out, b"chr1\t0\t10\tg1\t.\t+\tsrc\tgene\t.\tID=g1\n");
    }
}
