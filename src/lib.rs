//! convert2bed: streaming conversion of genomic formats to BED
//!
//! This library converts BAM, SAM, GFF, GTF and PSL records to BED by wiring
//! a fixed chain of stages together with OS pipes.
//!
//! # Features
//!
//! - **Streaming**: every stage works in bounded memory, records are never
//!   collected
//! - **Chunking-safe**: lines are reassembled across arbitrary read sizes
//! - **External tools**: BAM decoding, sorting and Starch compression are
//!   delegated to `samtools`, `sort-bed` and `starch`
//!
//! # Example
//!
//! ```rust,no_run
//! use convert2bed::{ConversionConfig, ConversionPipeline, InputFormat, ToolPaths};
//! use std::io;
//!
//! let config = ConversionConfig::new(InputFormat::Gff).with_sort(false);
//! let tools = ToolPaths::resolve(&config).unwrap();
//! let pipeline = ConversionPipeline::build(&config, &tools).unwrap();
//! let (stats, _stdout) = pipeline.run(io::stdin(), io::stdout()).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod streaming;
pub mod tools;

// Re-export commonly used types
pub use config::{ConversionConfig, InputFormat, OutputFormat, StarchCompression};
pub use convert::{Converter, LineConverter};
pub use error::{ConvertError, RecordError, Result};
pub use pipeline::{ConversionPipeline, PipelineStats, Topology};
pub use tools::ToolPaths;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ConversionConfig, InputFormat, OutputFormat, StarchCompression};
    pub use crate::convert::{Converter, LineConverter};
    pub use crate::error::{ConvertError, RecordError};
    pub use crate::pipeline::{ConversionPipeline, PipelineStats, Topology};
    pub use crate::streaming::LineAssembler;
    pub use crate::tools::ToolPaths;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_basic_workflow() {
        let config = ConversionConfig::new(InputFormat::Gtf);
        let converter = Converter::for_config(&config);
        let mut assembler = LineAssembler::new(converter, config.max_line_length);

        let input = "chr1\ts\texon\t11\t20\t.\t+\t.\tgene_id \"g1\";\n\
                     chr1\ts\texon\t31\t31\t.\t+\t.\tgene_id \"g1\";\n";
        let mut output = Vec::new();
        let stats = assembler.run(&mut input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(stats.lines, 2);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("chr1\t10\t20\tg1\t"));
        assert!(rows[1].starts_with("chr1\t30\t31\tg1\t"));
        assert!(rows[1].ends_with("zero_length_insertion \"True\";"));
    }

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
