// ==============================================================================
// controls.rs - Reference Controls Table Parser
// ==============================================================================
// Description: Parser for delimited tables of expected control peaks
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
// Format: CSV (.csv) or tab-delimited (.tsv/.txt) with header
// Example:
//   gene,reference_sample,Exp_peaks,Exp_repeats
//   gene1,CTRL1,289/376,30/51
//   gene1,CTRL2,297/323,33/45
//   FRAX,FX1,291/348,30/49
// The gene column (or "sheet") is optional; without it every row applies.
// ==============================================================================

use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ReferencePeak;

/// Errors that can occur during reference controls parsing
#[derive(Error, Debug)]
pub enum ControlsParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid {field} at record {record}: expected two '/'-separated values, found '{value}'")]
    MalformedPair {
        record: usize,
        field: String,
        value: String,
    },

    #[error("Invalid {field} at record {record}: '{value}' is not a number")]
    InvalidNumber {
        record: usize,
        field: String,
        value: String,
    },

    #[error("No reference controls found for gene {0}")]
    NoControls(String),
}

#[derive(Debug, Deserialize)]
struct ControlRow {
    #[serde(default, alias = "sheet")]
    gene: Option<String>,

    #[serde(default)]
    reference_sample: Option<String>,

    #[serde(rename = "Exp_peaks", default)]
    exp_peaks: Option<String>,

    #[serde(rename = "Exp_repeats", default)]
    exp_repeats: Option<String>,
}

/// Reference controls table parser
pub struct ControlsParser;

impl ControlsParser {
    /// Parse the expected control peaks for `gene`
    ///
    /// Rows with a blank `reference_sample` are skipped (spreadsheet exports
    /// carry trailing empty rows). Rows for other genes are skipped when the
    /// table has a gene column.
    pub fn parse(path: impl AsRef<Path>, gene: &str) -> Result<Vec<ReferencePeak>, ControlsParseError> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
            _ => b'\t',
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut peaks = Vec::new();

        for (idx, result) in reader.deserialize().enumerate() {
            let record = idx + 1;
            let row: ControlRow = result?;

            let Some(reference_sample) = row
                .reference_sample
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
            else {
                continue;
            };

            if let Some(row_gene) = row.gene.as_deref().map(str::trim) {
                if !row_gene.is_empty() && row_gene != gene {
                    continue;
                }
            }

            let peak = reference_peak(
                record,
                reference_sample,
                row.exp_peaks.as_deref().unwrap_or(""),
                row.exp_repeats.as_deref().unwrap_or(""),
            )?;
            debug!("Reference control {:?}", peak);
            peaks.push(peak);
        }

        if peaks.is_empty() {
            return Err(ControlsParseError::NoControls(gene.to_string()));
        }

        info!("Loaded {} reference controls for {}", peaks.len(), gene);
        Ok(peaks)
    }
}

/// Build a reference peak from the raw `Exp_peaks` / `Exp_repeats` cells
pub fn reference_peak(
    record: usize,
    reference_sample_id: String,
    exp_peaks: &str,
    exp_repeats: &str,
) -> Result<ReferencePeak, ControlsParseError> {
    let (peak1, peak2) = split_pair(record, "Exp_peaks", exp_peaks)?;
    let (repeats1, repeats2) = split_pair(record, "Exp_repeats", exp_repeats)?;

    Ok(ReferencePeak {
        reference_sample_id,
        expected_size1: parse_number(record, "Exp_peaks", peak1)?,
        expected_size2: parse_number(record, "Exp_peaks", peak2)?,
        repeat_count1: parse_number(record, "Exp_repeats", repeats1)?,
        repeat_count2: parse_number(record, "Exp_repeats", repeats2)?,
    })
}

/// Split an "a/b" cell into its two trimmed halves
pub fn split_pair<'a>(
    record: usize,
    field: &str,
    value: &'a str,
) -> Result<(&'a str, &'a str), ControlsParseError> {
    let parts: Vec<&str> = value.split('/').map(str::trim).collect();

    match parts.as_slice() {
        [first, second] if !first.is_empty() && !second.is_empty() => Ok((*first, *second)),
        _ => Err(ControlsParseError::MalformedPair {
            record,
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(
    record: usize,
    field: &str,
    value: &str,
) -> Result<T, ControlsParseError> {
    value.parse::<T>().map_err(|_| ControlsParseError::InvalidNumber {
        record,
        field: field.to_string(),
        value: value.to_string(),
    })
}
