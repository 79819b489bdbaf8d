//! convert2bed: convert BAM, GFF, GTF, PSL and SAM to BED or Starch
//!
//! Usage: convert2bed --input=fmt [--output=fmt] [options] < input > output

use clap::Parser;
use log::{info, warn, LevelFilter};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;

use convert2bed::config::starch_compression_from_flags;
use convert2bed::streaming::buffers::DEFAULT_MAX_LINE_LENGTH;
use convert2bed::{
    ConversionConfig, ConversionPipeline, ConvertError, InputFormat, OutputFormat, ToolPaths,
};

#[derive(Parser)]
#[command(name = "convert2bed")]
#[command(version)]
#[command(
    about = "Convert BAM, GFF, GTF, PSL or SAM on standard input to sorted BED or Starch",
    long_about = "Convert BAM, GFF, GTF, PSL or SAM on standard input to BED (or Starch) on \
                  standard output. BAM input needs samtools, sorted output needs sort-bed and \
                  Starch output needs starch, all found on PATH."
)]
struct Cli {
    /// Input format: bam, gff, gtf, psl or sam
    #[arg(short, long, value_name = "FMT")]
    input: InputFormat,

    /// Output format: bed or starch
    #[arg(short, long, value_name = "FMT", default_value = "bed")]
    output: OutputFormat,

    /// Do not sort BED output with sort-bed (ignored for Starch output)
    #[arg(short, long)]
    do_not_sort: bool,

    /// Include unmapped reads (BAM/SAM)
    #[arg(short, long)]
    all_reads: bool,

    /// Keep header and comment lines as `_header` BED rows
    #[arg(short, long)]
    keep_header: bool,

    /// Split spliced reads into one BED row per block (BAM/SAM)
    #[arg(short, long)]
    split: bool,

    /// Input starts with the 5-line psLayout banner (PSL)
    #[arg(short = 'p', long)]
    headered: bool,

    /// Memory limit passed to sort-bed --max-mem (default 2G)
    #[arg(short, long, value_name = "VALUE")]
    max_mem: Option<String>,

    /// Temporary directory passed to sort-bed --tmpdir
    #[arg(short = 'r', long, value_name = "DIR")]
    sort_tmpdir: Option<PathBuf>,

    /// Compress Starch output with bzip2 (default)
    #[arg(short = 'z', long)]
    starch_bzip2: bool,

    /// Compress Starch output with gzip
    #[arg(short = 'g', long)]
    starch_gzip: bool,

    /// Note embedded in the Starch archive
    #[arg(short = 'e', long, value_name = "NOTE")]
    starch_note: Option<String>,

    /// Longest accepted input line in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Print pipeline statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<ConversionConfig, ConvertError> {
        let compression = starch_compression_from_flags(self.starch_bzip2, self.starch_gzip)?;
        let mut config = ConversionConfig::new(self.input)
            .with_output(self.output)
            .with_sort(!self.do_not_sort)
            .with_split(self.split)
            .with_all_reads(self.all_reads)
            .with_keep_header(self.keep_header)
            .with_headered(self.headered)
            .with_max_line_length(self.max_line_length);
        if let Some(compression) = compression {
            config = config.with_starch_compression(compression);
        }
        if let Some(note) = &self.starch_note {
            config = config.with_starch_note(note.clone());
        }
        if let Some(max_mem) = &self.max_mem {
            config = config.with_max_mem(max_mem.clone());
        }
        if let Some(dir) = &self.sort_tmpdir {
            config = config.with_sort_tmpdir(dir.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<(), ConvertError> {
    let config = cli.config()?;
    for option in config.ignored_options() {
        warn!("{} has no effect with {} input", option, config.input_format);
    }

    if io::stdin().is_terminal() {
        return Err(ConvertError::NoInput);
    }

    let tools = ToolPaths::resolve(&config)?;
    let pipeline = ConversionPipeline::build(&config, &tools)?;
    info!(
        "Converting {} to {} ({} pipeline)",
        config.input_format,
        config.output_format,
        pipeline.topology()
    );

    let (stats, _stdout) = pipeline.run(io::stdin(), io::stdout())?;
    if cli.stats {
        eprintln!("Conversion stats: {}", stats);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
