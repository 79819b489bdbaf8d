//! The three pipeline shapes.
//!
//! A topology depends only on the output format and whether sorting is on;
//! the input format only decides which command runs on slot 0 and which
//! converter runs in the conversion stage.
//!
//! ```text
//! unsorted BED:  stdin -> in[0] | source | out[0] -> convert -> in[1] -> stdout
//! sorted BED:    ... convert -> in[1] -> in[2] | sort-bed | out[2] -> stdout
//! Starch:        ... out[2] -> in[3] | starch | out[3] -> stdout
//! ```

use super::command::ExternalCommand;
use super::pipes::PipeRef;
use super::stage::{Endpoint, ExternalStage, Stage};
use crate::config::{ConversionConfig, OutputFormat};
use crate::convert::Converter;
use crate::error::{ConvertError, Result};
use crate::tools::ToolPaths;
use std::fmt;

const SOURCE_SLOT: usize = 0;
const CONVERT_SLOT: usize = 1;
const SORT_SLOT: usize = 2;
const STARCH_SLOT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    UnsortedBed,
    SortedBed,
    Starch,
}

impl Topology {
    /// Starch output always goes through the sort stage.
    pub fn select(output: OutputFormat, sort: bool) -> Self {
        match (output, sort) {
            (OutputFormat::Starch, _) => Topology::Starch,
            (OutputFormat::Bed, true) => Topology::SortedBed,
            (OutputFormat::Bed, false) => Topology::UnsortedBed,
        }
    }

    pub fn for_config(config: &ConversionConfig) -> Self {
        Self::select(config.output_format, config.sort)
    }

    /// Pipe slots the topology uses.
    pub fn slots(self) -> usize {
        match self {
            Topology::UnsortedBed => 2,
            Topology::SortedBed => 3,
            Topology::Starch => 4,
        }
    }

    pub fn sorts(self) -> bool {
        !matches!(self, Topology::UnsortedBed)
    }

    /// Build the in-process and external stage lists.
    pub fn layout(
        self,
        config: &ConversionConfig,
        tools: &ToolPaths,
    ) -> Result<(Vec<Stage>, Vec<ExternalStage>)> {
        let pipe = Endpoint::Pipe;
        let mut stages = vec![
            Stage::pass("read-input", Endpoint::Stdin, pipe(PipeRef::input(SOURCE_SLOT))),
            Stage::convert(
                "convert",
                pipe(PipeRef::output(SOURCE_SLOT)),
                pipe(PipeRef::input(CONVERT_SLOT)),
                Converter::for_config(config),
            ),
        ];
        let mut externals = vec![ExternalStage {
            name: "source",
            slot: SOURCE_SLOT,
            command: ExternalCommand::source(config, tools)?,
        }];

        if self == Topology::UnsortedBed {
            stages.push(Stage::pass(
                "write-output",
                pipe(PipeRef::input(CONVERT_SLOT)),
                Endpoint::Stdout,
            ));
            return Ok((stages, externals));
        }

        let sort_bed = tools.sort_bed.as_deref().ok_or(ConvertError::MissingTool {
            tool: "sort-bed".to_string(),
            purpose: "sorting BED output",
        })?;
        stages.push(Stage::pass(
            "to-sort",
            pipe(PipeRef::input(CONVERT_SLOT)),
            pipe(PipeRef::input(SORT_SLOT)),
        ));
        externals.push(ExternalStage {
            name: "sort-bed",
            slot: SORT_SLOT,
            command: ExternalCommand::sort_bed(sort_bed, config),
        });

        if self == Topology::SortedBed {
            stages.push(Stage::pass(
                "write-output",
                pipe(PipeRef::output(SORT_SLOT)),
                Endpoint::Stdout,
            ));
            return Ok((stages, externals));
        }

        let starch = tools.starch.as_deref().ok_or(ConvertError::MissingTool {
            tool: "starch".to_string(),
            purpose: "Starch output",
        })?;
        stages.push(Stage::pass(
            "to-starch",
            pipe(PipeRef::output(SORT_SLOT)),
            pipe(PipeRef::input(STARCH_SLOT)),
        ));
        externals.push(ExternalStage {
            name: "starch",
            slot: STARCH_SLOT,
            command: ExternalCommand::starch(starch, config),
        });
        stages.push(Stage::pass(
            "write-output",
            pipe(PipeRef::output(STARCH_SLOT)),
            Endpoint::Stdout,
        ));
        Ok((stages, externals))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::UnsortedBed => f.write_str("unsorted BED"),
            Topology::SortedBed => f.write_str("sorted BED"),
            Topology::Starch => f.write_str("Starch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputFormat;

    fn tools() -> ToolPaths {
        ToolPaths::new("/bin/cat")
            .with_samtools("/usr/bin/samtools")
            .with_sort_bed("/usr/bin/sort-bed")
            .with_starch("/usr/bin/starch")
    }

    fn wiring(stages: &[Stage]) -> Vec<String> {
        stages
            .iter()
            .map(|s| format!("{}->{}", s.source, s.destination))
            .collect()
    }

    #[test]
    fn test_select() {
        assert_eq!(Topology::select(OutputFormat::Bed, false), Topology::UnsortedBed);
        assert_eq!(Topology::select(OutputFormat::Bed, true), Topology::SortedBed);
        assert_eq!(Topology::select(OutputFormat::Starch, false), Topology::Starch);
        assert_eq!(Topology::select(OutputFormat::Starch, true), Topology::Starch);
    }

    #[test]
    fn test_unsorted_layout() {
        let config = ConversionConfig::new(InputFormat::Gff).with_sort(false);
        let (stages, externals) = Topology::UnsortedBed.layout(&config, &tools()).unwrap();
        assert_eq!(
            wiring(&stages),
            vec!["stdin->in[0]", "out[0]->in[1]", "in[1]->stdout"]
        );
        assert_eq!(externals.len(), 1);
        assert_eq!(externals[0].command.to_string(), "/bin/cat -");
        assert!(stages[1].transform.is_some());
    }

    #[test]
    fn test_sorted_layout() {
        let config = ConversionConfig::new(InputFormat::Bam);
        let (stages, externals) = Topology::SortedBed.layout(&config, &tools()).unwrap();
        assert_eq!(
            wiring(&stages),
            vec!["stdin->in[0]", "out[0]->in[1]", "in[1]->in[2]", "out[2]->stdout"]
        );
        let slots: Vec<usize> = externals.iter().map(|e| e.slot).collect();
        assert_eq!(slots, vec![0, 2]);
        assert_eq!(
            externals[0].command.to_string(),
            "/usr/bin/samtools view -h -"
        );
    }

    #[test]
    fn test_starch_layout() {
        let config = ConversionConfig::new(InputFormat::Psl).with_output(OutputFormat::Starch);
        let (stages, externals) = Topology::Starch.layout(&config, &tools()).unwrap();
        assert_eq!(
            wiring(&stages),
            vec![
                "stdin->in[0]",
                "out[0]->in[1]",
                "in[1]->in[2]",
                "out[2]->in[3]",
                "out[3]->stdout"
            ]
        );
        let names: Vec<&str> = externals.iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["source", "sort-bed", "starch"]);
    }

    #[test]
    fn test_layout_is_independent_of_input_format() {
        let formats = [
            InputFormat::Bam,
            InputFormat::Gff,
            InputFormat::Gtf,
            InputFormat::Psl,
            InputFormat::Sam,
        ];
        for topology in [Topology::UnsortedBed, Topology::SortedBed, Topology::Starch] {
            let expected = {
                let config = ConversionConfig::new(InputFormat::Sam);
                wiring(&topology.layout(&config, &tools()).unwrap().0)
            };
            for format in formats {
                let config = ConversionConfig::new(format);
                let (stages, _) = topology.layout(&config, &tools()).unwrap();
                assert_eq!(wiring(&stages), expected, "{} {}", topology, format);
            }
        }
    }

    #[test]
    fn test_missing_sort_bed() {
        let config = ConversionConfig::new(InputFormat::Gtf);
        let err = Topology::SortedBed
            .layout(&config, &ToolPaths::new("/bin/cat"))
            .unwrap_err();
        assert!(matches!(err, ConvertError::MissingTool { ref tool, .. } if tool == "sort-bed"));
    }
}
