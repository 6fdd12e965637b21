// ==============================================================================
// models.rs - Triplet Repeat Data Models
// ==============================================================================
// Description: Data structures for control calibration and repeat inference
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};

/// Sample labels that mark a GeneMapper row as a calibration control
pub const CONTROL_LABELS: [&str; 2] = ["Normal", "Control"];

/// Sample label of the no-template (blank) control
pub const NO_TEMPLATE_LABEL: &str = "NTC";

/// Number of peak size columns exported per sample
pub const PEAK_SLOTS: usize = 3;

/// Role of a GeneMapper row within the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// Patient sample with unknown repeat count
    Sample,
    /// Control with a known repeat count in the reference table
    Control,
    /// No-template control, carries no peaks of interest
    NoTemplate,
}

impl RecordKind {
    /// Classify a derived sample identifier
    pub fn classify(sample_id: &str) -> Self {
        if CONTROL_LABELS.contains(&sample_id) {
            RecordKind::Control
        } else if sample_id == NO_TEMPLATE_LABEL {
            RecordKind::NoTemplate
        } else {
            RecordKind::Sample
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Sample => "Sample",
            RecordKind::Control => "Control",
            RecordKind::NoTemplate => "NoTemplate",
        }
    }
}

/// One row of a GeneMapper export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Raw "Sample File" value (e.g., "A01_Sample1_run3.fsa")
    pub source_id: String,

    /// Second `_`-delimited field of `source_id` (e.g., "Sample1", "Normal")
    pub sample_id: String,

    /// Third `_`-delimited field, used as the reference key for controls
    pub reference_id: Option<String>,

    /// Called peak sizes; `None` when GeneMapper did not call the peak
    pub size1: Option<f64>,
    pub size2: Option<f64>,
    pub size3: Option<f64>,
}

impl MeasurementRecord {
    pub fn kind(&self) -> RecordKind {
        RecordKind::classify(&self.sample_id)
    }

    pub fn sizes(&self) -> [Option<f64>; PEAK_SLOTS] {
        [self.size1, self.size2, self.size3]
    }
}

/// Expected peaks for one control in the reference controls table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePeak {
    pub reference_sample_id: String,
    pub expected_size1: f64,
    pub expected_size2: f64,
    pub repeat_count1: i32,
    pub repeat_count2: i32,
}

/// A run control joined to its reference table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedControl {
    pub reference_sample_id: String,
    pub source_id: String,
    pub measured_size1: Option<f64>,
    pub measured_size2: Option<f64>,
    pub expected_size1: f64,
    pub expected_size2: f64,
    pub repeat_count1: i32,
    pub repeat_count2: i32,
}

impl ValidatedControl {
    pub fn join(record: &MeasurementRecord, reference: &ReferencePeak) -> Self {
        Self {
            reference_sample_id: reference.reference_sample_id.clone(),
            source_id: record.source_id.clone(),
            measured_size1: record.size1,
            measured_size2: record.size2,
            expected_size1: reference.expected_size1,
            expected_size2: reference.expected_size2,
            repeat_count1: reference.repeat_count1,
            repeat_count2: reference.repeat_count2,
        }
    }

    /// expected - measured for peak 1 (`None` if the peak was not called)
    pub fn diff1(&self) -> Option<f64> {
        self.measured_size1.map(|m| self.expected_size1 - m)
    }

    /// expected - measured for peak 2 (`None` if the peak was not called)
    pub fn diff2(&self) -> Option<f64> {
        self.measured_size2.map(|m| self.expected_size2 - m)
    }
}

/// Nearest reference peak for a measured size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakMatch {
    pub closest_size: f64,
    pub closest_repeat_count: i32,
}

/// Matching and inference result for one peak slot of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotCall {
    /// Measured size after rounding to the nearest integer
    pub measured_size: Option<f64>,
    pub closest_size: Option<f64>,
    pub closest_repeat_count: Option<i32>,
    pub inferred_repeat_count: Option<i32>,
}

/// A sample record with per-slot matches and inferred repeat counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSampleRow {
    pub source_id: String,
    pub sample_id: String,
    pub slots: [SlotCall; PEAK_SLOTS],
}

impl MatchedSampleRow {
    pub fn measured_sizes(&self) -> [Option<f64>; PEAK_SLOTS] {
        self.slots.map(|s| s.measured_size)
    }

    pub fn inferred_repeat_counts(&self) -> [Option<i32>; PEAK_SLOTS] {
        self.slots.map(|s| s.inferred_repeat_count)
    }
}

/// Numeric policy applied during calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPolicy {
    /// Maximum |expected - measured| for a control peak (closed window)
    pub tolerance: f64,
    /// Fragment size shift per repeat unit (3 bp for triplets)
    pub repeat_unit: f64,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            tolerance: 3.0,
            repeat_unit: 3.0,
        }
    }
}
