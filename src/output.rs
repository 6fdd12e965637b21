// ==============================================================================
// output.rs - Multi-Format Report Generation
// ==============================================================================
// Description: Writes triplet repeat results for reporting and reviewer sign-off
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use csv::WriterBuilder;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::models::{MatchedSampleRow, ValidatedControl};

/// Column order of the results table
pub const RESULT_COLUMNS: [&str; 7] = [
    "Sample File",
    "Size 1",
    "Size 2",
    "Size 3",
    "Repeats_1",
    "Repeats_2",
    "Repeats_3",
];

/// Written in place of an absent size or repeat count
pub const MISSING_VALUE: &str = "NaN";

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-delimited results table (laboratory report)
    Tsv,
    /// Results table with reviewer sign-off block (opens in spreadsheets)
    Review,
    /// JSON with run metadata and validated controls
    Json,
    /// SQLite database with results, controls and metadata tables
    Sqlite,
}

impl OutputFormat {
    pub const DEFAULT: [OutputFormat; 2] = [OutputFormat::Tsv, OutputFormat::Review];

    /// File name suffix appended to `{worksheet}_{gene}_`
    pub fn file_suffix(&self) -> &'static str {
        match self {
            OutputFormat::Tsv => "triplets_output.txt",
            OutputFormat::Review => "triplets_review.csv",
            OutputFormat::Json => "triplets_output.json",
            OutputFormat::Sqlite => "triplets_output.db",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tsv" | "txt" => Ok(OutputFormat::Tsv),
            "review" => Ok(OutputFormat::Review),
            "json" => Ok(OutputFormat::Json),
            "sqlite" | "db" => Ok(OutputFormat::Sqlite),
            other => Err(anyhow::anyhow!("Unknown output format: {}", other)),
        }
    }
}

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripletReport {
    pub metadata: ReportMetadata,
    pub rows: Vec<ResultRowOutput>,
    pub controls: Vec<ValidatedControl>,
}

/// Run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub run_id: String,
    pub worksheet: String,
    pub gene: String,
    pub processing_date: String,
    pub tolerance: f64,
    pub repeat_unit: f64,
    pub genemapper_sha256: String,
    pub controls_sha256: String,
    pub sample_count: usize,
    pub control_count: usize,
    pub unmatched_controls: Vec<String>,
}

/// One results table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRowOutput {
    pub sample_file: String,
    pub sample_id: String,
    pub size_1: Option<i64>,
    pub size_2: Option<i64>,
    pub size_3: Option<i64>,
    pub repeats_1: Option<i32>,
    pub repeats_2: Option<i32>,
    pub repeats_3: Option<i32>,
}

impl From<&MatchedSampleRow> for ResultRowOutput {
    fn from(row: &MatchedSampleRow) -> Self {
        let [size_1, size_2, size_3] = row.measured_sizes().map(|s| s.map(|v| v as i64));
        let [repeats_1, repeats_2, repeats_3] = row.inferred_repeat_counts();

        Self {
            sample_file: row.source_id.clone(),
            sample_id: row.sample_id.clone(),
            size_1,
            size_2,
            size_3,
            repeats_1,
            repeats_2,
            repeats_3,
        }
    }
}

impl ResultRowOutput {
    /// Cells in `RESULT_COLUMNS` order
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.sample_file.clone(),
            format_cell(self.size_1),
            format_cell(self.size_2),
            format_cell(self.size_3),
            format_cell(self.repeats_1),
            format_cell(self.repeats_2),
            format_cell(self.repeats_3),
        ]
    }
}

fn format_cell<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING_VALUE.to_string())
}

/// Multi-format report generator
pub struct OutputGenerator {
    run_prefix: String,
    worksheet: String,
    output_dir: PathBuf,
}

impl OutputGenerator {
    pub fn new(run_prefix: String, worksheet: String, output_dir: PathBuf) -> Self {
        Self {
            run_prefix,
            worksheet,
            output_dir,
        }
    }

    pub fn path_for(&self, format: OutputFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}", self.run_prefix, format.file_suffix()))
    }

    /// Generate the report in each requested format
    ///
    /// # Returns
    /// * HashMap of format -> file path
    pub fn generate(
        &self,
        formats: &[OutputFormat],
        report: &TripletReport,
    ) -> Result<HashMap<OutputFormat, PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut result = HashMap::new();

        for format in formats {
            let path = self.path_for(*format);

            match format {
                OutputFormat::Tsv => self.generate_tsv(&path, report)?,
                OutputFormat::Review => self.generate_review(&path, report)?,
                OutputFormat::Json => self.generate_json(&path, report)?,
                OutputFormat::Sqlite => self.generate_sqlite(&path, report)?,
            }

            result.insert(*format, path);
        }

        Ok(result)
    }

    /// Replace the results table with a single message line
    ///
    /// Reports left by an earlier run of the same worksheet/gene are removed
    /// so only the message remains.
    pub fn write_message(&self, message: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        self.remove_stale_reports()?;

        let path = self.path_for(OutputFormat::Tsv);
        std::fs::write(&path, message)
            .with_context(|| format!("Failed to write message to {:?}", path))?;

        info!("Wrote run message to {:?}: {}", path, message);
        Ok(path)
    }

    fn remove_stale_reports(&self) -> Result<()> {
        for format in [OutputFormat::Review, OutputFormat::Json, OutputFormat::Sqlite] {
            let path = self.path_for(format);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove stale report {:?}", path))?;
                warn!("Removed stale {:?} report {:?}", format, path);
            }
        }
        Ok(())
    }

    fn generate_tsv(&self, path: &Path, report: &TripletReport) -> Result<()> {
        info!("Generating results table: {:?}", path);

        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .context("Failed to create results table")?;

        writer.write_record(RESULT_COLUMNS)?;
        for row in &report.rows {
            writer.write_record(row.cells())?;
        }
        writer.flush().context("Failed to write results table")?;

        info!("Results table complete: {} samples", report.rows.len());
        Ok(())
    }

    fn generate_review(&self, path: &Path, report: &TripletReport) -> Result<()> {
        info!("Generating review sheet: {:?}", path);

        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .context("Failed to create review sheet")?;

        writer.write_record(RESULT_COLUMNS)?;
        for row in &report.rows {
            writer.write_record(row.cells())?;
        }

        // Sign-off block, filled in by hand
        writer.write_record(["", ""])?;
        writer.write_record(["Worksheet:", self.worksheet.as_str()])?;
        for label in ["First checker:", "Date:", "Second checker:", "Date:"] {
            writer.write_record([label, ""])?;
        }
        writer.flush().context("Failed to write review sheet")?;

        Ok(())
    }

    fn generate_json(&self, path: &Path, report: &TripletReport) -> Result<()> {
        info!("Generating JSON output: {:?}", path);

        let file = std::fs::File::create(path).context("Failed to create JSON output file")?;
        serde_json::to_writer_pretty(file, report).context("Failed to write JSON output")?;

        Ok(())
    }

    fn generate_sqlite(&self, path: &Path, report: &TripletReport) -> Result<()> {
        info!("Generating SQLite output: {:?}", path);

        if path.exists() {
            std::fs::remove_file(path).context("Failed to replace SQLite output")?;
        }
        let mut conn = Connection::open(path).context("Failed to create SQLite database")?;

        conn.execute(
            "CREATE TABLE triplet_results (
                row_index INTEGER PRIMARY KEY,
                sample_file TEXT NOT NULL,
                sample_id TEXT NOT NULL,
                size_1 INTEGER,
                size_2 INTEGER,
                size_3 INTEGER,
                repeats_1 INTEGER,
                repeats_2 INTEGER,
                repeats_3 INTEGER
            )",
            [],
        )
        .context("Failed to create triplet_results table")?;

        conn.execute(
            "CREATE TABLE validated_controls (
                reference_sample TEXT NOT NULL,
                sample_file TEXT NOT NULL,
                measured_size_1 REAL,
                measured_size_2 REAL,
                expected_size_1 REAL NOT NULL,
                expected_size_2 REAL NOT NULL,
                repeats_1 INTEGER NOT NULL,
                repeats_2 INTEGER NOT NULL
            )",
            [],
        )
        .context("Failed to create validated_controls table")?;

        conn.execute(
            "CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create metadata table")?;

        let metadata = &report.metadata;
        let tolerance_str = metadata.tolerance.to_string();
        let repeat_unit_str = metadata.repeat_unit.to_string();
        let sample_count_str = metadata.sample_count.to_string();
        let control_count_str = metadata.control_count.to_string();

        let metadata_items = vec![
            ("run_id", &metadata.run_id),
            ("worksheet", &metadata.worksheet),
            ("gene", &metadata.gene),
            ("processing_date", &metadata.processing_date),
            ("tolerance", &tolerance_str),
            ("repeat_unit", &repeat_unit_str),
            ("genemapper_sha256", &metadata.genemapper_sha256),
            ("controls_sha256", &metadata.controls_sha256),
            ("sample_count", &sample_count_str),
            ("control_count", &control_count_str),
        ];

        let tx = conn.transaction().context("Failed to start transaction")?;
        {
            let mut stmt = tx.prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")?;
            for (key, value) in metadata_items {
                stmt.execute(params![key, value])
                    .context("Failed to insert metadata")?;
            }

            let mut stmt = tx
                .prepare(
                    "INSERT INTO triplet_results
                     (row_index, sample_file, sample_id, size_1, size_2, size_3, repeats_1, repeats_2, repeats_3)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .context("Failed to prepare results insert statement")?;
            for (idx, row) in report.rows.iter().enumerate() {
                stmt.execute(params![
                    idx as i64,
                    row.sample_file,
                    row.sample_id,
                    row.size_1,
                    row.size_2,
                    row.size_3,
                    row.repeats_1,
                    row.repeats_2,
                    row.repeats_3,
                ])
                .context("Failed to insert result row")?;
            }

            let mut stmt = tx
                .prepare(
                    "INSERT INTO validated_controls
                     (reference_sample, sample_file, measured_size_1, measured_size_2,
                      expected_size_1, expected_size_2, repeats_1, repeats_2)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .context("Failed to prepare controls insert statement")?;
            for control in &report.controls {
                stmt.execute(params![
                    control.reference_sample_id,
                    control.source_id,
                    control.measured_size1,
                    control.measured_size2,
                    control.expected_size1,
                    control.expected_size2,
                    control.repeat_count1,
                    control.repeat_count2,
                ])
                .context("Failed to insert validated control")?;
            }
        }
        tx.commit().context("Failed to commit run output")?;

        info!(
            "SQLite output complete: {} samples, {} controls",
            report.rows.len(),
            report.controls.len()
        );

        Ok(())
    }
}
