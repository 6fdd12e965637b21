// ==============================================================================
// repeat_calculator.rs - Repeat Count Back-Calculation
// ==============================================================================
// Description: Converts matched reference peaks into inferred repeat counts
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use tracing::debug;

use crate::calibration::matcher::{match_peak, normalize_size};
use crate::calibration::ReferencePeakSet;
use crate::models::{CalibrationPolicy, MatchedSampleRow, MeasurementRecord, SlotCall};

/// Infer the repeat count for a measured size
///
/// `closest_repeat_count + round((measured - closest) / repeat_unit)`, with
/// the offset rounded half away from zero. Any absent input yields `None`.
pub fn infer_repeat_count(
    measured_size: Option<f64>,
    closest_size: Option<f64>,
    closest_repeat_count: Option<i32>,
    policy: &CalibrationPolicy,
) -> Option<i32> {
    let measured = measured_size?;
    let closest = closest_size?;
    let repeats = closest_repeat_count?;

    let offset = ((measured - closest) / policy.repeat_unit).round();
    if !offset.is_finite() {
        return None;
    }

    Some(repeats + offset as i32)
}

/// Match and infer a single peak slot
pub fn call_slot(
    size: Option<f64>,
    reference_set: &ReferencePeakSet,
    policy: &CalibrationPolicy,
) -> SlotCall {
    let measured_size = normalize_size(size);
    let Some(peak) = match_peak(measured_size, reference_set) else {
        return SlotCall {
            measured_size,
            ..SlotCall::default()
        };
    };

    SlotCall {
        measured_size,
        closest_size: Some(peak.closest_size),
        closest_repeat_count: Some(peak.closest_repeat_count),
        inferred_repeat_count: infer_repeat_count(
            measured_size,
            Some(peak.closest_size),
            Some(peak.closest_repeat_count),
            policy,
        ),
    }
}

/// Match and infer all three peak slots of a sample
pub fn call_sample(
    record: &MeasurementRecord,
    reference_set: &ReferencePeakSet,
    policy: &CalibrationPolicy,
) -> MatchedSampleRow {
    let slots = record
        .sizes()
        .map(|size| call_slot(size, reference_set, policy));

    debug!(
        "{}: sizes {:?} -> repeats {:?}",
        record.sample_id,
        slots.map(|s| s.measured_size),
        slots.map(|s| s.inferred_repeat_count)
    );

    MatchedSampleRow {
        source_id: record.source_id.clone(),
        sample_id: record.sample_id.clone(),
        slots,
    }
}

/// Match and infer every sample in run order
pub fn call_samples(
    samples: &[MeasurementRecord],
    reference_set: &ReferencePeakSet,
    policy: &CalibrationPolicy,
) -> Vec<MatchedSampleRow> {
    samples
        .iter()
        .map(|record| call_sample(record, reference_set, policy))
        .collect()
}
