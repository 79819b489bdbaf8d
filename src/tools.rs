//! Resolution of the external programs a run needs.
//!
//! `cat` is always needed; `samtools`, `sort-bed` and `starch` only when the
//! input format or topology uses them. Each is looked up on `PATH` once,
//! before the pipeline is built.

use crate::config::{ConversionConfig, InputFormat, OutputFormat};
use crate::error::{ConvertError, Result};
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Absolute paths of the helper programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub cat: PathBuf,
    pub samtools: Option<PathBuf>,
    pub sort_bed: Option<PathBuf>,
    pub starch: Option<PathBuf>,
}

impl ToolPaths {
    pub fn new(cat: impl Into<PathBuf>) -> Self {
        Self {
            cat: cat.into(),
            samtools: None,
            sort_bed: None,
            starch: None,
        }
    }

    pub fn with_samtools(mut self, path: impl Into<PathBuf>) -> Self {
        self.samtools = Some(path.into());
        self
    }

    pub fn with_sort_bed(mut self, path: impl Into<PathBuf>) -> Self {
        self.sort_bed = Some(path.into());
        self
    }

    pub fn with_starch(mut self, path: impl Into<PathBuf>) -> Self {
        self.starch = Some(path.into());
        self
    }

    /// Find every tool `config` needs on the `PATH` environment variable.
    pub fn resolve(config: &ConversionConfig) -> Result<Self> {
        let search_path = env::var_os("PATH").ok_or_else(|| {
            ConvertError::Config("cannot retrieve environment PATH variable".to_string())
        })?;
        Self::resolve_in(config, &search_path)
    }

    /// Like [`ToolPaths::resolve`] with an explicit search path.
    pub fn resolve_in(config: &ConversionConfig, search_path: &OsStr) -> Result<Self> {
        let require = |tool: &str, purpose: &'static str| {
            find_executable(tool, search_path).ok_or_else(|| ConvertError::MissingTool {
                tool: tool.to_string(),
                purpose,
            })
        };

        let mut tools = Self::new(require("cat", "reading input")?);
        if config.input_format == InputFormat::Bam {
            tools.samtools = Some(require("samtools", "BAM input")?);
        }
        if config.sorts_output() {
            tools.sort_bed = Some(require("sort-bed", "sorting BED output")?);
        }
        if config.output_format == OutputFormat::Starch {
            tools.starch = Some(require("starch", "Starch output")?);
        }
        Ok(tools)
    }
}

/// First executable regular file called `name` on `search_path`.
///
/// A name containing `/` is checked as given. Empty `PATH` entries mean
/// the current directory.
pub fn find_executable(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }
    env::split_paths(search_path)
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(".").join(name)
            } else {
                dir.join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
