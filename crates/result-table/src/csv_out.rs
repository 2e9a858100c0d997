use std::io::{self, Write};
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::ReconstructError;
use crate::model::ReconstructOutcome;

fn write_records<W: Write>(
    writer: &mut Writer<W>,
    outcome: &ReconstructOutcome,
) -> Result<(), ReconstructError> {
    writer.write_record(&outcome.headers)?;
    for record in &outcome.rows {
        writer.write_record(record.values())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_outcome_csv(
    path: &Path,
    outcome: &ReconstructOutcome,
    delimiter: u8,
) -> Result<(), ReconstructError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, outcome)
}

fn csv_text(bytes: Vec<u8>) -> Result<String, ReconstructError> {
    String::from_utf8(bytes)
        .map_err(|error| ReconstructError::Io(io::Error::new(io::ErrorKind::InvalidData, error)))
}

pub fn outcome_to_csv_string(
    outcome: &ReconstructOutcome,
    delimiter: u8,
) -> Result<String, ReconstructError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, outcome)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ReconstructError::Csv(error.into_error().into()))?;
    csv_text(bytes)
}

#[cfg(test)]
mod tests {
    use super::{csv_text, outcome_to_csv_string};
    use crate::error::ReconstructError;
    use crate::model::{OutcomeMetadata, ReconstructOutcome, Record, TableOrigin};

    fn outcome(headers: &[&str], rows: &[&[&str]]) -> ReconstructOutcome {
        let headers = headers.iter().map(|h| (*h).to_string()).collect::<Vec<_>>();
        let rows = rows
            .iter()
            .map(|row| {
                let cells = row.iter().map(|c| (*c).to_string()).collect::<Vec<_>>();
                Record::from_row(&headers, &cells)
            })
            .collect::<Vec<_>>();
        ReconstructOutcome {
            success: !rows.is_empty(),
            metadata: OutcomeMetadata {
                confidence: 0.8,
                total_rows: rows.len(),
                column_count: headers.len(),
                is_multi_page: false,
                origin: TableOrigin::Geometric,
                exam_result: false,
                page_breakdown: Vec::new(),
                issues: Vec::new(),
                ambiguous_rows: Vec::new(),
                errors: Vec::new(),
            },
            headers,
            rows,
        }
    }

    #[test]
    fn writes_header_then_rows_in_column_order() {
        let csv = outcome_to_csv_string(
            &outcome(&["ROLL", "NAME"], &[&["101", "SMITH, JOHN"]]),
            b',',
        )
        .expect("csv should render");
        assert_eq!(csv, "ROLL,NAME\n101,\"SMITH, JOHN\"\n");
    }

    #[test]
    fn honours_custom_delimiter() {
        let csv = outcome_to_csv_string(&outcome(&["A", "B"], &[&["1", "2"]]), b';')
            .expect("csv should render");
        assert_eq!(csv, "A;B\n1;2\n");
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let error = csv_text(vec![0x66, 0xFF, 0x6F]).expect_err("bytes are not utf-8");
        assert!(matches!(error, ReconstructError::Io(_)));
    }
}
