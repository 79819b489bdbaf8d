//! GFF3 to BED conversion.
//!
//! Column mapping:
//!
//! | GFF field  | BED column |
//! |------------|------------|
//! | seqid      | 1 chrom    |
//! | start - 1  | 2 start    |
//! | end        | 3 stop     |
//! | `ID=` attr | 4 id       |
//! | score      | 5 score    |
//! | strand     | 6 strand   |
//! | source, type, phase, attributes | 7-10 |
//!
//! A feature with `start == end` (a zero-length insertion point) is widened
//! to one base and tagged with `zero_length_insertion=True`.

use super::header::HeaderRows;
use super::{FeatureInterval, LineConverter, MISSING_ID};
use crate::config::InputFormat;
use crate::error::RecordError;
use crate::streaming::buffers::DEFAULT_FIELD_CAPACITY;
use crate::streaming::output::BedRow;
use crate::streaming::parsing::FieldOffsets;

const GFF_FIELDS: usize = 9;
const GFF_FASTA_DIRECTIVE: &[u8] = b"##FASTA";
const GFF_ID_KEY: &[u8] = b"ID=";
const GFF_ZERO_LENGTH_ATTRIBUTE: &[u8] = b";zero_length_insertion=True";

/// Streaming GFF3 converter.
#[derive(Debug)]
pub struct GffConverter {
    keep_header: bool,
    headers: HeaderRows,
    offsets: FieldOffsets,
}

impl GffConverter {
    pub fn new(keep_header: bool) -> Self {
        Self {
            keep_header,
            headers: HeaderRows::new(),
            offsets: FieldOffsets::with_capacity(DEFAULT_FIELD_CAPACITY),
        }
    }
}

impl LineConverter for GffConverter {
    fn convert_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), RecordError> {
        if line.first() == Some(&b'#') {
            if self.keep_header && !line.starts_with(GFF_FASTA_DIRECTIVE) {
                self.headers.push(line, out);
            }
            return Ok(());
        }

        let fields = self.offsets.scan(line);
        // FASTA section bodies and blank lines carry no tab
        if fields.len() == 1 {
            return Ok(());
        }
        if fields.len() != GFF_FIELDS {
            return Err(RecordError::FieldCount {
                found: fields.len(),
                min: GFF_FIELDS,
                max: GFF_FIELDS,
            });
        }

        let interval = FeatureInterval::from_closed(fields.get(3), fields.get(4))?;
        let attributes = fields.get(8);
        let id = gff_id(attributes).unwrap_or(MISSING_ID);

        let mut row = BedRow::new(out, fields.get(0), interval.start, interval.end);
        row.push(id)
            .push(fields.get(5))
            .push(fields.get(6))
            .push(fields.get(1))
            .push(fields.get(2))
            .push(fields.get(7));
        if interval.zero_length {
            row.push_joined(attributes, GFF_ZERO_LENGTH_ATTRIBUTE);
        } else {
            row.push(attributes);
        }
        row.finish();
        Ok(())
    }

    fn format(&self) -> InputFormat {
        InputFormat::Gff
    }
}

/// Value of the first `ID=` key in a GFF3 attributes column.
pub fn gff_id(attributes: &[u8]) -> Option<&[u8]> {
    attributes
        .split(|&b| b == b';')
        .map(|kv| kv.trim_ascii())
        .find_map(|kv| kv.strip_prefix(GFF_ID_KEY))
        .filter(|id| !id.is_empty())
}
