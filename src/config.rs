//! Run configuration for a conversion.
//!
//! A [`ConversionConfig`] is built once from the command line (or directly in
//! library code) and is read-only afterwards. The pipeline builder and every
//! converter take their settings from it.

use crate::error::{ConvertError, Result};
use crate::streaming::buffers::DEFAULT_MAX_LINE_LENGTH;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Input formats accepted on standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    Bam,
    Gff,
    Gtf,
    Psl,
    Sam,
}

impl InputFormat {
    /// True for the alignment formats that share the SAM converter.
    #[inline]
    pub fn is_alignment(self) -> bool {
        matches!(self, InputFormat::Bam | InputFormat::Sam)
    }
}

impl FromStr for InputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bam" => Ok(InputFormat::Bam),
            "gff" => Ok(InputFormat::Gff),
            "gtf" => Ok(InputFormat::Gtf),
            "psl" => Ok(InputFormat::Psl),
            "sam" => Ok(InputFormat::Sam),
            other => Err(ConvertError::Config(format!(
                "unsupported input format '{}' (expected bam, gff, gtf, psl or sam)",
                other
            ))),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputFormat::Bam => "BAM",
            InputFormat::Gff => "GFF",
            InputFormat::Gtf => "GTF",
            InputFormat::Psl => "PSL",
            InputFormat::Sam => "SAM",
        };
        f.write_str(name)
    }
}

/// Output formats written to standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Bed,
    Starch,
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bed" => Ok(OutputFormat::Bed),
            "starch" => Ok(OutputFormat::Starch),
            other => Err(ConvertError::Config(format!(
                "unsupported output format '{}' (expected bed or starch)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Bed => f.write_str("BED"),
            OutputFormat::Starch => f.write_str("Starch"),
        }
    }
}

/// Compression backend passed to `starch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StarchCompression {
    #[default]
    Bzip2,
    Gzip,
}

/// Resolved, immutable settings for one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    /// Run the external sort stage (always on for Starch output).
    pub sort: bool,
    /// Split spliced SAM/BAM alignments on `N` CIGAR operations.
    pub split: bool,
    /// Keep unmapped SAM/BAM reads.
    pub all_reads: bool,
    /// Wrap header and comment lines into `_header` BED rows.
    pub keep_header: bool,
    /// PSL input starts with the 5-line psLayout banner.
    pub headered: bool,
    /// Explicit Starch compression; `None` uses the bzip2 default.
    pub starch_compression: Option<StarchCompression>,
    pub starch_note: Option<String>,
    /// Forwarded verbatim to `sort-bed --max-mem`.
    pub max_mem: Option<String>,
    /// Forwarded verbatim to `sort-bed --tmpdir`.
    pub sort_tmpdir: Option<PathBuf>,
    /// Longest accepted input line, including its newline.
    pub max_line_length: usize,
}

impl ConversionConfig {
    pub fn new(input_format: InputFormat) -> Self {
        Self {
            input_format,
            output_format: OutputFormat::Bed,
            sort: true,
            split: false,
            all_reads: false,
            keep_header: false,
            headered: false,
            starch_compression: None,
            starch_note: None,
            max_mem: None,
            sort_tmpdir: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    pub fn with_output(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    pub fn with_all_reads(mut self, all_reads: bool) -> Self {
        self.all_reads = all_reads;
        self
    }

    pub fn with_keep_header(mut self, keep_header: bool) -> Self {
        self.keep_header = keep_header;
        self
    }

    pub fn with_headered(mut self, headered: bool) -> Self {
        self.headered = headered;
        self
    }

    pub fn with_starch_compression(mut self, compression: StarchCompression) -> Self {
        self.starch_compression = Some(compression);
        self
    }

    pub fn with_starch_note(mut self, note: impl Into<String>) -> Self {
        self.starch_note = Some(note.into());
        self
    }

    pub fn with_max_mem(mut self, max_mem: impl Into<String>) -> Self {
        self.max_mem = Some(max_mem.into());
        self
    }

    pub fn with_sort_tmpdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sort_tmpdir = Some(dir.into());
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Whether the external sort stage is part of the pipeline.
    ///
    /// Starch archives hold sorted BED, so Starch output sorts even when
    /// sorting was switched off.
    #[inline]
    pub fn sorts_output(&self) -> bool {
        self.sort || self.output_format == OutputFormat::Starch
    }

    /// Reject option combinations that cannot be honoured.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length == 0 {
            return Err(ConvertError::Config(
                "maximum line length must be greater than zero".to_string(),
            ));
        }
        if self.output_format == OutputFormat::Bed
            && (self.starch_note.is_some() || self.starch_compression.is_some())
        {
            return Err(ConvertError::Config(
                "cannot specify Starch options without setting output format to Starch"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Options that are accepted but have no effect for the input format.
    pub fn ignored_options(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if !self.input_format.is_alignment() {
            if self.split {
                ignored.push("--split");
            }
            if self.all_reads {
                ignored.push("--all-reads");
            }
        }
        if self.headered && self.input_format != InputFormat::Psl {
            ignored.push("--headered");
        }
        if !self.sorts_output() && (self.max_mem.is_some() || self.sort_tmpdir.is_some()) {
            ignored.push("--max-mem/--sort-tmpdir");
        }
        ignored
    }
}

/// Pick the Starch compression from the two mutually exclusive flags.
///
/// Returns None when neither flag is given.
pub fn starch_compression_from_flags(
    bzip2: bool,
    gzip: bool,
) -> Result<Option<StarchCompression>> {
    match (bzip2, gzip) {
        (true, true) => Err(ConvertError::Config(
            "cannot specify both Starch compression options".to_string(),
        )),
        (true, false) => Ok(Some(StarchCompression::Bzip2)),
        (false, true) => Ok(Some(StarchCompression::Gzip)),
        (false, false) => Ok(None),
    }
}
