//! External filter commands run as pipeline stages.
//!
//! Commands are spawned directly, without a shell, from a resolved program
//! path and a fixed argument template:
//!
//! | Stage  | Command |
//! |--------|---------|
//! | source | `cat -` or `samtools view -h -` |
//! | sort   | `sort-bed --max-mem <V> [--tmpdir <P>] -` |
//! | starch | `starch --bzip2\|--gzip [--note=<N>] -` |

use crate::config::{ConversionConfig, InputFormat, StarchCompression};
use crate::error::{ConvertError, Result};
use crate::tools::ToolPaths;
use std::ffi::OsString;
use std::fmt;
use std::io::{PipeReader, PipeWriter};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// `sort-bed --max-mem` when none is configured.
pub const DEFAULT_SORT_MAX_MEM: &str = "2G";

/// A program path plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `cat -`
    pub fn cat(path: &Path) -> Self {
        Self::new(path).arg("-")
    }

    /// `samtools view -h -`, decoding BAM to SAM text with headers.
    pub fn samtools_view(path: &Path) -> Self {
        Self::new(path).arg("view").arg("-h").arg("-")
    }

    /// The stage feeding the converter, chosen by input format.
    pub fn source(config: &ConversionConfig, tools: &ToolPaths) -> Result<Self> {
        match config.input_format {
            InputFormat::Bam => {
                let samtools = tools.samtools.as_deref().ok_or(ConvertError::MissingTool {
                    tool: "samtools".to_string(),
                    purpose: "BAM input",
                })?;
                Ok(Self::samtools_view(samtools))
            }
            _ => Ok(Self::cat(&tools.cat)),
        }
    }

    pub fn sort_bed(path: &Path, config: &ConversionConfig) -> Self {
        let max_mem = config.max_mem.as_deref().unwrap_or(DEFAULT_SORT_MAX_MEM);
        let mut cmd = Self::new(path).arg("--max-mem").arg(max_mem);
        if let Some(dir) = &config.sort_tmpdir {
            cmd = cmd.arg("--tmpdir").arg(dir);
        }
        cmd.arg("-")
    }

    pub fn starch(path: &Path, config: &ConversionConfig) -> Self {
        let compression = match config.starch_compression.unwrap_or_default() {
            StarchCompression::Bzip2 => "--bzip2",
            StarchCompression::Gzip => "--gzip",
        };
        let mut cmd = Self::new(path).arg(compression);
        if let Some(note) = &config.starch_note {
            cmd = cmd.arg(format!("--note={}", note));
        }
        cmd.arg("-")
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Program file name, for error messages.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Spawn with stdin/stdout bound to the given pipe ends.
    ///
    /// The `Command` holding the parent's copies of both ends is dropped
    /// before returning, so EOF reaches the child as soon as the stage
    /// feeding `stdin` closes its writer.
    pub fn spawn(&self, stdin: PipeReader, stdout: PipeWriter, stderr: Stdio) -> Result<Child> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(stderr);
        let child = command.spawn().map_err(|source| ConvertError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        drop(command);
        Ok(child)
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    fn tools() -> ToolPaths {
        ToolPaths::new("/bin/cat")
            .with_samtools("/opt/bin/samtools")
            .with_sort_bed("/opt/bin/sort-bed")
            .with_starch("/opt/bin/starch")
    }

    #[test]
    fn test_source_commands() {
        let config = ConversionConfig::new(InputFormat::Gff);
        let cmd = ExternalCommand::source(&config, &tools()).unwrap();
        assert_eq!(cmd.to_string(), "/bin/cat -");

        let config = ConversionConfig::new(InputFormat::Bam);
        let cmd = ExternalCommand::source(&config, &tools()).unwrap();
        assert_eq!(cmd.to_string(), "/opt/bin/samtools view -h -");
        assert_eq!(cmd.name(), "samtools");
    }

    #[test]
    fn test_bam_without_samtools() {
        let config = ConversionConfig::new(InputFormat::Bam);
        let err = ExternalCommand::source(&config, &ToolPaths::new("/bin/cat")).unwrap_err();
        assert!(matches!(err, ConvertError::MissingTool { ref tool, .. } if tool == "samtools"));
    }

    #[test]
    fn test_sort_bed_arguments() {
        let path = Path::new("/opt/bin/sort-bed");
        let config = ConversionConfig::new(InputFormat::Gtf);
        assert_eq!(
            ExternalCommand::sort_bed(path, &config).to_string(),
            "/opt/bin/sort-bed --max-mem 2G -"
        );

        let config = ConversionConfig::new(InputFormat::Gtf)
            .with_max_mem("8G")
            .with_sort_tmpdir("/scratch");
        assert_eq!(
            ExternalCommand::sort_bed(path, &config).to_string(),
            "/opt/bin/sort-bed --max-mem 8G --tmpdir /scratch -"
        );
    }

    #[test]
    fn test_starch_arguments() {
        let path = Path::new("/opt/bin/starch");
        let config = ConversionConfig::new(InputFormat::Sam).with_output(OutputFormat::Starch);
        assert_eq!(
            ExternalCommand::starch(path, &config).to_string(),
            "/opt/bin/starch --bzip2 -"
        );

        let config = config
            .with_starch_compression(StarchCompression::Gzip)
            .with_starch_note("hg38 reads");
        let cmd = ExternalCommand::starch(path, &config);
        assert_eq!(cmd.args()[1], OsString::from("--note=hg38 reads"));
        assert_eq!(cmd.to_string(), "/opt/bin/starch --gzip --note=hg38 reads -");
    }

    #[test]
    fn test_spawn_missing_program() {
        let mut pipes = crate::pipeline::pipes::PipeSet::create(1).unwrap();
        let stdin = pipes
            .take_reader(crate::pipeline::pipes::PipeRef::input(0))
            .unwrap();
        let stdout = pipes
            .take_writer(crate::pipeline::pipes::PipeRef::output(0))
            .unwrap();
        let cmd = ExternalCommand::new("/nonexistent/convert2bed-tool").arg("-");
        let err = cmd.spawn(stdin, stdout, Stdio::inherit()).unwrap_err();
        assert!(matches!(err, ConvertError::Spawn { .. }));
    }
}
