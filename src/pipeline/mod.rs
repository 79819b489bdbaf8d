//! Multi-stage conversion pipeline.
//!
//! A run wires a fixed set of stages together with OS pipes:
//! - in-process stages run on named threads and move bytes between
//!   endpoints, one of them through the format converter
//! - external commands (`cat`/`samtools`, `sort-bed`, `starch`) run as child
//!   processes attached to pipe slots
//!
//! Backpressure comes from the pipes themselves: a writer blocks while the
//! pipe buffer is full. Every pipe end has exactly one owner, and each owner
//! closes its write end when it finishes so EOF flows downstream.
//!
//! # Failure handling
//!
//! The first stage error that is not a broken pipe is returned as soon as
//! it is reported. Broken pipes are usually caused by a stage further down
//! dying, so they are only reported when nothing else failed. Child exit
//! status is checked after all stages finish. A run that fails early kills
//! and reaps the children it already started.

pub mod command;
pub mod pipes;
pub mod stage;
pub mod topology;

pub use command::ExternalCommand;
pub use pipes::{Channel, PipeRef, PipeSet};
pub use stage::{Endpoint, ExternalStage, Stage, StageReport, StageRunner};
pub use topology::Topology;

use crate::config::ConversionConfig;
use crate::error::{ConvertError, Result};
use crate::tools::ToolPaths;
use log::{debug, info, warn};
use stage::{StageInput, StageOutput};
use std::fmt;
use std::io::{Read, Write};
use std::process::Child;
use std::thread;

/// A fully built pipeline, ready to run once.
#[derive(Debug)]
pub struct ConversionPipeline {
    topology: Topology,
    stages: Vec<Stage>,
    externals: Vec<ExternalStage>,
    runner: StageRunner,
}

impl ConversionPipeline {
    /// Select the topology and build every stage for `config`.
    pub fn build(config: &ConversionConfig, tools: &ToolPaths) -> Result<Self> {
        config.validate()?;
        let topology = Topology::for_config(config);
        let (stages, externals) = topology.layout(config, tools)?;
        debug!(
            "Built {} pipeline: {} in-process stages, {} external commands",
            topology,
            stages.len(),
            externals.len()
        );
        Ok(Self {
            topology,
            stages,
            externals,
            runner: StageRunner::new(config),
        })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn externals(&self) -> &[ExternalStage] {
        &self.externals
    }

    /// Run every stage to completion, reading `source` and writing `sink`.
    ///
    /// Returns the sink once all stages have finished and all child
    /// processes have been reaped.
    pub fn run<R, W>(self, source: R, sink: W) -> Result<(PipelineStats, W)>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let Self {
            topology,
            stages,
            externals,
            runner,
        } = self;

        let mut pipes = PipeSet::create(topology.slots())?;
        debug!("Allocated {} pipe slots", pipes.len());

        let mut children = ChildSet::with_capacity(externals.len());
        for external in &externals {
            let stdin = pipes.take_reader(PipeRef::input(external.slot))?;
            let stdout = pipes.take_writer(PipeRef::output(external.slot))?;
            let child = external
                .command
                .spawn(stdin, stdout, pipes.error_stdio())?;
            debug!(
                "Spawned {} (pid {}) on slot {}: {}",
                external.name,
                child.id(),
                external.slot,
                external.command
            );
            children.push(external.command.name(), child);
        }

        let mut source = Some(source);
        let mut sink = Some(sink);
        let mut bound = Vec::with_capacity(stages.len());
        for stage in stages {
            let input = match stage.source {
                Endpoint::Stdin => StageInput::Source(
                    source
                        .take()
                        .ok_or_else(|| ConvertError::PipeEndTaken("stdin".to_string()))?,
                ),
                Endpoint::Pipe(pipe) => StageInput::Pipe(pipes.take_reader(pipe)?),
                Endpoint::Stdout => {
                    return Err(ConvertError::Config(format!(
                        "stage '{}' cannot read from stdout",
                        stage.name
                    )))
                }
            };
            let output = match stage.destination {
                Endpoint::Stdout => StageOutput::Sink(
                    sink.take()
                        .ok_or_else(|| ConvertError::PipeEndTaken("stdout".to_string()))?,
                ),
                Endpoint::Pipe(pipe) => StageOutput::Pipe(pipes.take_writer(pipe)?),
                Endpoint::Stdin => {
                    return Err(ConvertError::Config(format!(
                        "stage '{}' cannot write to stdin",
                        stage.name
                    )))
                }
            };
            bound.push((stage, input, output));
        }
        if sink.is_some() {
            return Err(ConvertError::Config(
                "pipeline has no stage writing to stdout".to_string(),
            ));
        }
        let unused = pipes.release_unused();
        debug!("Released {} unused pipe ends", unused);

        let (tx, rx) = crossbeam_channel::unbounded::<StageEvent>();
        let mut handles = Vec::with_capacity(bound.len());
        for (stage, mut input, mut output) in bound {
            let tx = tx.clone();
            let name = stage.name;
            debug!("Starting stage {}: {} -> {}", name, stage.source, stage.destination);
            let handle = thread::Builder::new()
                .name(format!("c2b-{}", name))
                .spawn(move || {
                    let result = runner.run(name, stage.transform, &mut input, &mut output);
                    drop(input);
                    // pipe writers close here, before the event is seen
                    let sink = output.into_sink();
                    let _ = tx.send(StageEvent { name, result });
                    sink
                })?;
            handles.push((name, handle));
        }
        drop(tx);

        let mut reports = Vec::with_capacity(handles.len());
        let mut broken_pipe = None;
        for event in rx.iter() {
            match event.result {
                Ok(report) => {
                    debug!("Finished stage {}", report);
                    reports.push(report);
                }
                Err(e) if e.is_broken_pipe() => {
                    debug!("Stage {} hit a closed pipe", event.name);
                    broken_pipe.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        let mut sink = None;
        for (name, handle) in handles {
            match handle.join() {
                Ok(Some(w)) => sink = Some(w),
                Ok(None) => {}
                Err(_) => return Err(ConvertError::StagePanicked(name.to_string())),
            }
        }

        let child_failure = children.wait_all()?;
        if let Some(e) = child_failure.or(broken_pipe) {
            return Err(e);
        }

        let sink = sink.ok_or_else(|| ConvertError::StagePanicked("write-output".to_string()))?;
        reports.sort_by_key(|r| stage_order(r.name));
        let stats = PipelineStats { topology, reports };
        info!("{}", stats);
        Ok((stats, sink))
    }
}

/// Child processes of one run.
///
/// Children still in the set when it is dropped (a run that failed before
/// `wait_all`) are killed and reaped.
struct ChildSet {
    children: Vec<(String, Child)>,
}

impl ChildSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            children: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, program: String, child: Child) {
        self.children.push((program, child));
    }

    /// Wait for every child in spawn order.
    ///
    /// Returns the first non-zero exit as `ChildFailed`.
    fn wait_all(&mut self) -> Result<Option<ConvertError>> {
        let mut failure = None;
        while !self.children.is_empty() {
            let (program, mut child) = self.children.remove(0);
            let status = child.wait()?;
            debug!("{} exited with {}", program, status);
            if !status.success() && failure.is_none() {
                failure = Some(ConvertError::ChildFailed { program, status });
            }
        }
        Ok(failure)
    }
}

impl Drop for ChildSet {
    fn drop(&mut self) {
        for (program, child) in &mut self.children {
            let _ = child.kill();
            match child.wait() {
                Ok(status) => debug!("Reaped {} ({})", program, status),
                Err(e) => warn!("Could not reap {}: {}", program, e),
            }
        }
    }
}

struct StageEvent {
    name: &'static str,
    result: Result<StageReport>,
}

fn stage_order(name: &str) -> usize {
    match name {
        "read-input" => 0,
        "convert" => 1,
        "to-sort" => 2,
        "to-starch" => 3,
        _ => 4,
    }
}

/// Counters from one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub topology: Topology,
    /// One report per in-process stage, in pipeline order
    pub reports: Vec<StageReport>,
}

impl PipelineStats {
    fn report(&self, name: &str) -> Option<&StageReport> {
        self.reports.iter().find(|r| r.name == name)
    }

    /// Bytes read from the source.
    pub fn bytes_in(&self) -> u64 {
        self.report("read-input").map_or(0, |r| r.bytes_read)
    }

    /// Bytes written to the sink.
    pub fn bytes_out(&self) -> u64 {
        self.report("write-output").map_or(0, |r| r.bytes_written)
    }

    /// Input lines seen by the converter.
    pub fn lines(&self) -> u64 {
        self.report("convert").map_or(0, |r| r.lines)
    }

    /// BED bytes produced by the converter.
    pub fn bed_bytes(&self) -> u64 {
        self.report("convert").map_or(0, |r| r.bytes_written)
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topology: {}, Lines: {}, Bytes in: {}, BED bytes: {}, Bytes out: {}",
            self.topology,
            self.lines(),
            self.bytes_in(),
            self.bed_bytes(),
            self.bytes_out()
        )
    }
}
