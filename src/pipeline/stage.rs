//! Pipeline stages and their execution.
//!
//! An in-process [`Stage`] moves bytes from a source endpoint to a
//! destination endpoint, either verbatim or through a line converter. An
//! [`ExternalStage`] attaches a child process to one pipe slot.

use super::command::ExternalCommand;
use super::pipes::PipeRef;
use crate::config::ConversionConfig;
use crate::convert::Converter;
use crate::error::{ConvertError, Result};
use crate::streaming::buffers::{DEFAULT_COPY_BUFFER, DEFAULT_MAX_LINE_LENGTH};
use crate::streaming::LineAssembler;
use std::fmt;
use std::io::{self, PipeReader, PipeWriter, Read, Write};

/// Where a stage reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The run's source (standard input for the binary)
    Stdin,
    /// The run's sink (standard output for the binary)
    Stdout,
    Pipe(PipeRef),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Stdin => f.write_str("stdin"),
            Endpoint::Stdout => f.write_str("stdout"),
            Endpoint::Pipe(pipe) => write!(f, "{}", pipe),
        }
    }
}

/// An in-process stage.
#[derive(Debug)]
pub struct Stage {
    pub name: &'static str,
    pub source: Endpoint,
    pub destination: Endpoint,
    /// None for a verbatim byte mover
    pub transform: Option<Converter>,
}

impl Stage {
    pub fn pass(name: &'static str, source: Endpoint, destination: Endpoint) -> Self {
        Self {
            name,
            source,
            destination,
            transform: None,
        }
    }

    pub fn convert(
        name: &'static str,
        source: Endpoint,
        destination: Endpoint,
        converter: Converter,
    ) -> Self {
        Self {
            name,
            source,
            destination,
            transform: Some(converter),
        }
    }
}

/// A child process reading `in[slot]` and writing `out[slot]`.
#[derive(Debug, Clone)]
pub struct ExternalStage {
    pub name: &'static str,
    pub slot: usize,
    pub command: ExternalCommand,
}

/// Input bound to a stage: the run's source or a pipe read end.
pub enum StageInput<R> {
    Source(R),
    Pipe(PipeReader),
}

impl<R: Read> Read for StageInput<R> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StageInput::Source(r) => r.read(buf),
            StageInput::Pipe(r) => r.read(buf),
        }
    }
}

/// Output bound to a stage: the run's sink or a pipe write end.
pub enum StageOutput<W> {
    Sink(W),
    Pipe(PipeWriter),
}

impl<W> StageOutput<W> {
    /// Give back the sink. A pipe writer is closed here.
    pub fn into_sink(self) -> Option<W> {
        match self {
            StageOutput::Sink(w) => Some(w),
            StageOutput::Pipe(_) => None,
        }
    }
}

impl<W: Write> Write for StageOutput<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StageOutput::Sink(w) => w.write(buf),
            StageOutput::Pipe(w) => w.write(buf),
        }
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            StageOutput::Sink(w) => w.write_all(buf),
            StageOutput::Pipe(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StageOutput::Sink(w) => w.flush(),
            StageOutput::Pipe(w) => w.flush(),
        }
    }
}

/// Byte and line counts from one finished stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub name: &'static str,
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Lines handed to the converter (0 for verbatim stages)
    pub lines: u64,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} bytes in, {} bytes out, {} lines",
            self.name, self.bytes_read, self.bytes_written, self.lines
        )
    }
}

/// Executes in-process stages with the run's buffer sizes.
#[derive(Debug, Clone, Copy)]
pub struct StageRunner {
    copy_buffer: usize,
    max_line_length: usize,
}

impl Default for StageRunner {
    fn default() -> Self {
        Self {
            copy_buffer: DEFAULT_COPY_BUFFER,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl StageRunner {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            copy_buffer: DEFAULT_COPY_BUFFER,
            max_line_length: config.max_line_length,
        }
    }

    pub fn with_copy_buffer(mut self, size: usize) -> Self {
        self.copy_buffer = size.max(1);
        self
    }

    /// Run a stage to completion over already-bound endpoints.
    pub fn run<R: Read, W: Write>(
        &self,
        name: &'static str,
        transform: Option<Converter>,
        input: &mut R,
        output: &mut W,
    ) -> Result<StageReport> {
        match transform {
            None => {
                let bytes = copy_bytes(input, output, self.copy_buffer)?;
                Ok(StageReport {
                    name,
                    bytes_read: bytes,
                    bytes_written: bytes,
                    lines: 0,
                })
            }
            Some(converter) => {
                let mut assembler = LineAssembler::new(converter, self.max_line_length);
                let stats = assembler.run(input, output)?;
                Ok(StageReport {
                    name,
                    bytes_read: stats.bytes_read,
                    bytes_written: stats.bytes_written,
                    lines: stats.lines,
                })
            }
        }
    }
}

/// Move bytes from `reader` to `writer` until EOF with a fixed buffer.
pub fn copy_bytes<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buf_size: usize,
) -> Result<u64> {
    let mut buf = vec![0u8; buf_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConvertError::Io(e)),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}
