// ==============================================================================
// genemapper.rs - GeneMapper Export Parser
// ==============================================================================
// Description: Parser for GeneMapper tab-delimited peak size exports
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
// Format: Tab-delimited text with a header row (40+ columns, most ignored)
// Example:
//   Sample File    Marker    Size 1    Size 2    Size 3    ...
//   A01_Sample1_r1.fsa    gene1    306.2    405.9    265.1
//   E01_Normal_CTRL1_r1.fsa    gene1    288.7    375.8
//   H01_NTC_r1.fsa    gene1
// ==============================================================================

use csv::ReaderBuilder;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{MeasurementRecord, RecordKind};

pub const SAMPLE_FILE_COLUMN: &str = "Sample File";
pub const SIZE_COLUMNS: [&str; 3] = ["Size 1", "Size 2", "Size 3"];

/// Errors that can occur during GeneMapper export parsing
#[derive(Error, Debug)]
pub enum GeneMapperParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid sample file name at line {line}: {value}")]
    InvalidSampleFile { line: usize, value: String },

    #[error("Invalid size value at line {line}, column '{column}': {value}")]
    InvalidSize {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Sample {sample} at line {line} has no Size 1 peak")]
    MissingPrimaryPeak { line: usize, sample: String },

    #[error("File is empty or contains no valid records")]
    EmptyFile,
}

/// Records of one GeneMapper run, split by role
#[derive(Debug, Clone, Default)]
pub struct GeneMapperRun {
    /// Patient samples, in file order
    pub samples: Vec<MeasurementRecord>,
    /// Calibration controls ("Normal" / "Control"), in file order
    pub controls: Vec<MeasurementRecord>,
    /// Number of no-template control rows dropped
    pub no_template_count: usize,
}

impl GeneMapperRun {
    pub fn total_records(&self) -> usize {
        self.samples.len() + self.controls.len() + self.no_template_count
    }
}

/// Parser for GeneMapper peak size exports
#[derive(Debug, Clone, Default)]
pub struct GeneMapperParser;

struct ColumnIndex {
    sample_file: usize,
    sizes: [Option<usize>; 3],
}

impl GeneMapperParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a GeneMapper export
    ///
    /// # Returns
    /// * `Ok(GeneMapperRun)` - Samples and controls in file order
    /// * `Err(GeneMapperParseError)` - Parse error
    ///
    /// # Format
    /// - "Sample File" is split on `_`; the second field is the sample id and,
    ///   for controls, the third field is the reference control id
    /// - "Size 1".."Size 3" are optional peak sizes; blank or `NaN` cells are
    ///   uncalled peaks
    /// - Blank lines are skipped, other columns are ignored
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<GeneMapperRun, GeneMapperParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        let columns = Self::index_columns(&headers)?;

        let mut run = GeneMapperRun::default();

        for (idx, result) in reader.records().enumerate() {
            // Header is line 1
            let line = idx + 2;
            let row = result?;

            let source_id = row.get(columns.sample_file).unwrap_or("").trim();
            if source_id.is_empty() {
                continue;
            }

            let record = Self::parse_record(&row, &columns, source_id, line)?;

            match record.kind() {
                RecordKind::Sample => {
                    if record.size1.is_none() {
                        return Err(GeneMapperParseError::MissingPrimaryPeak {
                            line,
                            sample: record.sample_id,
                        });
                    }
                    run.samples.push(record);
                }
                RecordKind::Control => run.controls.push(record),
                RecordKind::NoTemplate => {
                    debug!("Dropping no-template control {}", record.source_id);
                    run.no_template_count += 1;
                }
            }
        }

        if run.total_records() == 0 {
            return Err(GeneMapperParseError::EmptyFile);
        }

        if run.samples.is_empty() {
            warn!("GeneMapper export contains no patient samples");
        }

        info!(
            "Parsed GeneMapper export: {} samples, {} controls, {} NTC",
            run.samples.len(),
            run.controls.len(),
            run.no_template_count
        );

        Ok(run)
    }

    fn index_columns(headers: &csv::StringRecord) -> Result<ColumnIndex, GeneMapperParseError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let sample_file = find(SAMPLE_FILE_COLUMN)
            .ok_or_else(|| GeneMapperParseError::MissingColumn(SAMPLE_FILE_COLUMN.to_string()))?;

        let sizes = SIZE_COLUMNS.map(find);
        if sizes[0].is_none() {
            return Err(GeneMapperParseError::MissingColumn(SIZE_COLUMNS[0].to_string()));
        }

        Ok(ColumnIndex { sample_file, sizes })
    }

    fn parse_record(
        row: &csv::StringRecord,
        columns: &ColumnIndex,
        source_id: &str,
        line: usize,
    ) -> Result<MeasurementRecord, GeneMapperParseError> {
        let fields: Vec<&str> = source_id.split('_').collect();
        let sample_id = fields
            .get(1)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GeneMapperParseError::InvalidSampleFile {
                line,
                value: source_id.to_string(),
            })?
            .to_string();
        let reference_id = fields.get(2).map(|s| s.to_string());

        let mut sizes = [None; 3];
        for (slot, column) in columns.sizes.iter().enumerate() {
            let Some(column) = column else { continue };
            let value = row.get(*column).unwrap_or("");
            sizes[slot] = parse_size(value).map_err(|_| GeneMapperParseError::InvalidSize {
                line,
                column: SIZE_COLUMNS[slot].to_string(),
                value: value.to_string(),
            })?;
        }

        Ok(MeasurementRecord {
            source_id: source_id.to_string(),
            sample_id,
            reference_id,
            size1: sizes[0],
            size2: sizes[1],
            size3: sizes[2],
        })
    }
}

/// Parse a size cell; blank, `NaN` and infinite values are uncalled peaks
pub fn parse_size(value: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let size = value.parse::<f64>()?;
    Ok(Some(size).filter(|s| s.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Create a temporary test file with sample GeneMapper data
    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_valid_file() {
        let contents = "\
Sample File\tMarker\tSize 1\tSize 2\tSize 3
A01_Sample1_r1.fsa\tgene1\t306.2\t405.9\t265.1
B01_Sample2_r1.fsa\tgene1\t300\t\t
E01_Normal_CTRL1_r1.fsa\tgene1\t288.7\t375.8\t
F01_Control_CTRL2_r1.fsa\tgene1\t297.4\t323.0\t
H01_NTC_r1.fsa\tgene1\t\t\t
";
        let file = create_test_file(contents);
        let run = GeneMapperParser::new().parse(file.path()).unwrap();

        assert_eq!(run.samples.len(), 2);
        assert_eq!(run.controls.len(), 2);
        assert_eq!(run.no_template_count, 1);
        assert_eq!(run.total_records(), 5);

        // Sizes are kept as exported; rounding happens during matching
        assert_eq!(run.samples[0].sample_id, "Sample1");
        assert_eq!(run.samples[0].sizes(), [Some(306.2), Some(405.9), Some(265.1)]);
        assert_eq!(run.samples[1].sizes(), [Some(300.0), None, None]);

        assert_eq!(run.controls[0].sample_id, "Normal");
        assert_eq!(run.controls[0].reference_id.as_deref(), Some("CTRL1"));
        assert_eq!(run.controls[1].reference_id.as_deref(), Some("CTRL2"));
    }

    #[test]
    fn test_nan_and_ragged_rows() {
        let contents = "\
Sample File\tSize 1\tSize 2\tSize 3
A01_Sample1_r1.fsa\t306\tNaN
";
        let file = create_test_file(contents);
        let run = GeneMapperParser::new().parse(file.path()).unwrap();

        assert_eq!(run.samples[0].sizes(), [Some(306.0), None, None]);
    }

    #[test]
    fn test_missing_optional_size_columns() {
        let contents = "\
Sample File\tSize 1
A01_Sample1_r1.fsa\t306
";
        let file = create_test_file(contents);
        let run = GeneMapperParser::new().parse(file.path()).unwrap();
        assert_eq!(run.samples[0].sizes(), [Some(306.0), None, None]);
    }

    #[test]
    fn test_missing_sample_file_column() {
        let contents = "\
Sample Name\tSize 1
A01_Sample1_r1.fsa\t306
";
        let file = create_test_file(contents);
        match GeneMapperParser::new().parse(file.path()).unwrap_err() {
            GeneMapperParseError::MissingColumn(column) => assert_eq!(column, "Sample File"),
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_size() {
        let contents = "\
Sample File\tSize 1\tSize 2
A01_Sample1_r1.fsa\t306\tOL
";
        let file = create_test_file(contents);
        match GeneMapperParser::new().parse(file.path()).unwrap_err() {
            GeneMapperParseError::InvalidSize { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "Size 2");
                assert_eq!(value, "OL");
            }
            other => panic!("Expected InvalidSize error, got {:?}", other),
        }
    }

    #[test]
    fn test_sample_without_primary_peak() {
        let contents = "\
Sample File\tSize 1\tSize 2
A01_Sample1_r1.fsa\t306\t400
B01_Sample2_r1.fsa\t\t400
";
        let file = create_test_file(contents);
        match GeneMapperParser::new().parse(file.path()).unwrap_err() {
            GeneMapperParseError::MissingPrimaryPeak { line, sample } => {
                assert_eq!(line, 3);
                assert_eq!(sample, "Sample2");
            }
            other => panic!("Expected MissingPrimaryPeak error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_sample_file_name() {
        let contents = "\
Sample File\tSize 1
nounderscore.fsa\t306
";
        let file = create_test_file(contents);
        assert!(matches!(
            GeneMapperParser::new().parse(file.path()),
            Err(GeneMapperParseError::InvalidSampleFile { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        let contents = "Sample File\tSize 1\tSize 2\tSize 3\n";
        let file = create_test_file(contents);
        assert!(matches!(
            GeneMapperParser::new().parse(file.path()),
            Err(GeneMapperParseError::EmptyFile)
        ));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size(" 288.7 ").unwrap(), Some(288.7));
        assert_eq!(parse_size("").unwrap(), None);
        assert_eq!(parse_size("NaN").unwrap(), None);
        assert!(parse_size("OL").is_err());
    }
}
