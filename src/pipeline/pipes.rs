//! Pipe table connecting pipeline stages.
//!
//! A [`PipeSet`] owns `n` slots. Slot `i` has an `in` pipe and an `out`
//! pipe: an external command attached to slot `i` reads `in[i]` and writes
//! `out[i]`, while in-process stages move bytes between the free ends. The
//! error channel of every slot is the process's own stderr.
//!
//! Every end is handed out at most once, so each descriptor has exactly one
//! owner. Ends that nobody took are closed by [`PipeSet::release_unused`]
//! before stages start, otherwise a reader would never see EOF.

use crate::error::{ConvertError, Result};
use std::fmt;
use std::io::{self, PipeReader, PipeWriter};
use std::process::Stdio;

/// Which pipe of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    In,
    Out,
}

/// Address of one pipe in a [`PipeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeRef {
    pub slot: usize,
    pub channel: Channel,
}

impl PipeRef {
    pub const fn input(slot: usize) -> Self {
        Self {
            slot,
            channel: Channel::In,
        }
    }

    pub const fn output(slot: usize) -> Self {
        Self {
            slot,
            channel: Channel::Out,
        }
    }
}

impl fmt::Display for PipeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Channel::In => write!(f, "in[{}]", self.slot),
            Channel::Out => write!(f, "out[{}]", self.slot),
        }
    }
}

#[derive(Debug)]
struct Pipe {
    reader: Option<PipeReader>,
    writer: Option<PipeWriter>,
}

impl Pipe {
    fn open() -> Result<Self> {
        // std pipes are created close-on-exec
        let (reader, writer) = io::pipe().map_err(ConvertError::Pipe)?;
        Ok(Self {
            reader: Some(reader),
            writer: Some(writer),
        })
    }

    fn open_ends(&self) -> usize {
        self.reader.is_some() as usize + self.writer.is_some() as usize
    }
}

#[derive(Debug)]
struct Slot {
    input: Pipe,
    output: Pipe,
}

/// Fixed table of pipe pairs shared out to stages.
#[derive(Debug)]
pub struct PipeSet {
    slots: Vec<Slot>,
}

impl PipeSet {
    /// Allocate `n` slots. Any failure closes the pipes opened so far.
    pub fn create(n: usize) -> Result<Self> {
        let mut slots = Vec::with_capacity(n);
        for _ in 0..n {
            slots.push(Slot {
                input: Pipe::open()?,
                output: Pipe::open()?,
            });
        }
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn pipe_mut(&mut self, pipe: PipeRef) -> Result<&mut Pipe> {
        let slots = self.slots.len();
        let slot = self
            .slots
            .get_mut(pipe.slot)
            .ok_or_else(|| ConvertError::NoSuchPipe {
                pipe: pipe.to_string(),
                slots,
            })?;
        Ok(match pipe.channel {
            Channel::In => &mut slot.input,
            Channel::Out => &mut slot.output,
        })
    }

    /// Take ownership of the read end of `pipe`.
    pub fn take_reader(&mut self, pipe: PipeRef) -> Result<PipeReader> {
        self.pipe_mut(pipe)?
            .reader
            .take()
            .ok_or_else(|| ConvertError::PipeEndTaken(format!("{} (read end)", pipe)))
    }

    /// Take ownership of the write end of `pipe`.
    pub fn take_writer(&mut self, pipe: PipeRef) -> Result<PipeWriter> {
        self.pipe_mut(pipe)?
            .writer
            .take()
            .ok_or_else(|| ConvertError::PipeEndTaken(format!("{} (write end)", pipe)))
    }

    /// Stdio for a child's error channel: the process's stderr.
    pub fn error_stdio(&self) -> Stdio {
        Stdio::inherit()
    }

    /// Number of ends not yet handed out.
    pub fn open_ends(&self) -> usize {
        self.slots
            .iter()
            .map(|s| s.input.open_ends() + s.output.open_ends())
            .sum()
    }

    /// Close every end that was not taken.
    pub fn release_unused(self) -> usize {
        let closed = self.open_ends();
        drop(self);
        closed
    }
}
