//! GTF (GTF2.2) to BED conversion.
//!
//! Same column layout as GFF, with the id taken from `gene_id` and the
//! optional tenth GTF column (comments) appended as BED column 11.

use super::header::HeaderRows;
use super::{FeatureInterval, LineConverter, MISSING_ID};
use crate::config::InputFormat;
use crate::error::RecordError;
use crate::streaming::buffers::DEFAULT_FIELD_CAPACITY;
use crate::streaming::output::BedRow;
use crate::streaming::parsing::FieldOffsets;

const GTF_MIN_FIELDS: usize = 9;
const GTF_MAX_FIELDS: usize = 10;
const GTF_ID_KEY: &[u8] = b"gene_id";
const GTF_ZERO_LENGTH_ATTRIBUTE: &[u8] = b" zero_length_insertion \"True\";";

/// Streaming GTF converter.
#[derive(Debug)]
pub struct GtfConverter {
    keep_header: bool,
    headers: HeaderRows,
    offsets: FieldOffsets,
}

impl GtfConverter {
    pub fn new(keep_header: bool) -> Self {
        Self {
            keep_header,
            headers: HeaderRows::new(),
            offsets: FieldOffsets::with_capacity(DEFAULT_FIELD_CAPACITY),
        }
    }
}

impl LineConverter for GtfConverter {
    fn convert_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), RecordError> {
        if line.first() == Some(&b'#') {
            if self.keep_header {
                self.headers.push(line, out);
            }
            return Ok(());
        }

        let fields = self.offsets.scan(line);
        if fields.len() == 1 {
            return Ok(());
        }
        if !(GTF_MIN_FIELDS..=GTF_MAX_FIELDS).contains(&fields.len()) {
            return Err(RecordError::FieldCount {
                found: fields.len(),
                min: GTF_MIN_FIELDS,
                max: GTF_MAX_FIELDS,
            });
        }

        let interval = FeatureInterval::from_closed(fields.get(3), fields.get(4))?;
        let attributes = fields.get(8);
        let id = gtf_gene_id(attributes).unwrap_or(MISSING_ID);

        let mut row = BedRow::new(out, fields.get(0), interval.start, interval.end);
        row.push(id)
            .push(fields.get(5))
            .push(fields.get(6))
            .push(fields.get(1))
            .push(fields.get(2))
            .push(fields.get(7));
        if interval.zero_length {
            row.push_joined(attributes, GTF_ZERO_LENGTH_ATTRIBUTE);
        } else {
            row.push(attributes);
        }
        if fields.len() == GTF_MAX_FIELDS {
            row.push(fields.get(9));
        }
        row.finish();
        Ok(())
    }

    fn format(&self) -> InputFormat {
        InputFormat::Gtf
    }
}

/// Unquoted value of the `gene_id` attribute.
///
/// `gene_id "ENSG0001"; transcript_id "ENST0001";` yields `ENSG0001`.
pub fn gtf_gene_id(attributes: &[u8]) -> Option<&[u8]> {
    attributes
        .split(|&b| b == b';')
        .map(|kv| kv.trim_ascii())
        .find_map(|kv| {
            let value = kv.strip_prefix(GTF_ID_KEY)?;
            // require a separator so `gene_id_version` does not match
            if !value.first()?.is_ascii_whitespace() {
                return None;
            }
            let value = value.trim_ascii();
            let value = value
                .strip_prefix(b"\"")
                .and_then(|v| v.strip_suffix(b"\""))
                .unwrap_or(value);
            Some(value)
        })
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(converter: &mut GtfConverter, line: &str) -> String {
        let mut out = Vec::new();
        converter.convert_line(line.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_gtf_nine_fields() {
        let mut c = GtfConverter::new(false);
        let bed = convert(
            &mut c,
            "chr1\tHAVANA\texon\t100\t200\t.\t+\t.\tgene_id \"ENSG1\"; transcript_id \"ENST1\";",
        );
        assert_eq!(
            bed,
            "chr1\t99\t200\tENSG1\t.\t+\tHAVANA\texon\t.\tgene_id \"ENSG1\"; transcript_id \"ENST1\";\n"
        );
        assert_eq!(bed.trim_end().split('\t').count(), 10);
    }

    #[test]
    fn test_gtf_ten_fields_keeps_comment_column() {
        let mut c = GtfConverter::new(false);
        let bed = convert(
            &mut c,
            "chr1\tsrc\tCDS\t100\t200\t7\t-\t0\tgene_id \"g\";\tmanually curated",
        );
        let cols: Vec<&str> = bed.trim_end().split('\t').collect();
        assert_eq!(cols.len(), 11);
        assert_eq!(cols[3], "g");
        assert_eq!(cols[10], "manually curated");
    }

    #[test]
    fn test_gtf_zero_length_feature() {
        let mut c = GtfConverter::new(false);
        let bed = convert(&mut c, "chr3\tsrc\tsite\t42\t42\t.\t+\t.\tgene_id \"s1\";");
        assert_eq!(
            bed,
            "chr3\t41\t42\ts1\t.\t+\tsrc\tsite\t.\tgene_id \"s1\"; zero_length_insertion \"True\";\n"
        );
    }

    #[test]
    fn test_gtf_comments() {
        let mut c = GtfConverter::new(false);
        assert_eq!(convert(&mut c, "#!genome-version GRCh38"), "");

        let mut c = GtfConverter::new(true);
        assert_eq!(
            convert(&mut c, "#!genome-version GRCh38"),
            "_header\t0\t1\t#!genome-version GRCh38\n"
        );
    }

    #[test]
    fn test_gtf_field_count() {
        let mut c = GtfConverter::new(false);
        let line = "chr1\ta\tb\t1\t2\t.\t+\t.\tgene_id \"x\";\tc\textra";
        let err = c.convert_line(line.as_bytes(), &mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            RecordError::FieldCount {
                found: 11,
                min: 9,
                max: 10
            }
        );
    }

    #[test]
    fn test_gene_id_extraction() {
        assert_eq!(
            gtf_gene_id(b"gene_id \"ENSG1\"; transcript_id \"T\";"),
            Some(&b"ENSG1"[..])
        );
        assert_eq!(
            gtf_gene_id(b"transcript_id \"T\"; gene_id \"G2\";"),
            Some(&b"G2"[..])
        );
        assert_eq!(gtf_gene_id(b"gene_id unquoted;"), Some(&b"unquoted"[..]));
        assert_eq!(gtf_gene_id(b"gene_id_version \"3\";"), None);
        assert_eq!(gtf_gene_id(b"transcript_id \"T\";"), None);
    }
}
