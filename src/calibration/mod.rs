// ==============================================================================
// calibration/mod.rs - Control Calibration and Repeat Inference
// ==============================================================================
// Description: Control validation, reference peak set, matching, repeat calls
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

pub mod control_validator;
pub mod reference_set;
pub mod matcher;
pub mod repeat_calculator;

pub use control_validator::{validate_controls, within_tolerance, ControlValidation};
pub use reference_set::ReferencePeakSet;
pub use matcher::{closest_value, match_peak, normalize_size};
pub use repeat_calculator::{call_sample, call_samples, call_slot, infer_repeat_count};

use tracing::info;

use crate::models::{CalibrationPolicy, MatchedSampleRow, MeasurementRecord, ReferencePeak};

/// Result of calibrating one run
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Controls passed; every sample has been matched and called
    Called {
        validation: ControlValidation,
        reference_set: ReferencePeakSet,
        rows: Vec<MatchedSampleRow>,
    },
    /// At least one control is outside tolerance; no sample is called
    OutOfTolerance(ControlValidation),
}

impl CalibrationOutcome {
    pub fn validation(&self) -> &ControlValidation {
        match self {
            CalibrationOutcome::Called { validation, .. } => validation,
            CalibrationOutcome::OutOfTolerance(validation) => validation,
        }
    }
}

/// Run the calibration pipeline for one gene/worksheet
///
/// Controls are validated first; only if they pass is the reference peak
/// set built and every sample matched against it.
pub fn calibrate(
    samples: &[MeasurementRecord],
    controls: &[MeasurementRecord],
    references: &[ReferencePeak],
    policy: &CalibrationPolicy,
) -> CalibrationOutcome {
    let validation = validate_controls(controls, references, policy);
    if !validation.proceed {
        return CalibrationOutcome::OutOfTolerance(validation);
    }

    let reference_set = ReferencePeakSet::from_controls(&validation.validated);
    info!(
        "Built reference peak set: {} sizes from {} controls",
        reference_set.len(),
        validation.validated.len()
    );

    let rows = call_samples(samples, &reference_set, policy);

    CalibrationOutcome::Called {
        validation,
        reference_set,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source_id: &str, size1: f64, size2: Option<f64>, size3: Option<f64>) -> MeasurementRecord {
        let fields: Vec<&str> = source_id.split('_').collect();
        MeasurementRecord {
            source_id: source_id.to_string(),
            sample_id: fields[1].to_string(),
            reference_id: fields.get(2).map(|s| s.to_string()),
            size1: Some(size1),
            size2,
            size3,
        }
    }

    fn reference(id: &str, peaks: (f64, f64), repeats: (i32, i32)) -> ReferencePeak {
        ReferencePeak {
            reference_sample_id: id.to_string(),
            expected_size1: peaks.0,
            expected_size2: peaks.1,
            repeat_count1: repeats.0,
            repeat_count2: repeats.1,
        }
    }

    fn controls() -> Vec<MeasurementRecord> {
        vec![
            record("E01_Normal_CTRL1_r1.fsa", 288.7, Some(375.8), None),
            record("F01_Normal_CTRL2_r1.fsa", 297.4, Some(323.0), None),
            record("G01_Control_CTRL3_r1.fsa", 296.5, Some(275.9), None),
            record("H01_Control_CTRL4_r1.fsa", 304.5, Some(284.1), None),
        ]
    }

    fn references() -> Vec<ReferencePeak> {
        vec![
            reference("CTRL1", (289.0, 376.0), (30, 51)),
            reference("CTRL2", (299.0, 325.0), (33, 45)),
            reference("CTRL3", (297.0, 276.0), (32, 25)),
            reference("CTRL4", (305.0, 284.0), (35, 29)),
        ]
    }

    fn samples() -> Vec<MeasurementRecord> {
        vec![
            record("A01_Sample1_r1.fsa", 306.2, Some(405.9), Some(265.1)),
            record("A02_Sample2_r1.fsa", 299.8, Some(385.3), None),
            record("A03_Sample3_r1.fsa", 342.4, None, None),
            record("A04_Sample4_r1.fsa", 361.6, None, None),
            record("A05_Sample5_r1.fsa", 288.1, Some(486.4), Some(289.0)),
            record("A06_Sample6_r1.fsa", 305.7, None, None),
            record("A07_Sample7_r1.fsa", 314.9, Some(387.2), None),
        ]
    }

    #[test]
    fn test_calibrate_regression_run() {
        let outcome = calibrate(&samples(), &controls(), &references(), &CalibrationPolicy::default());

        let CalibrationOutcome::Called { rows, reference_set, .. } = outcome else {
            panic!("Expected controls to pass");
        };

        assert_eq!(reference_set.sizes(), &[289.0, 297.0, 305.0, 376.0, 323.0, 276.0, 284.0]);

        let closest_1: Vec<Option<f64>> = rows.iter().map(|r| r.slots[0].closest_size).collect();
        assert_eq!(
            closest_1,
            [305.0, 297.0, 323.0, 376.0, 289.0, 305.0, 323.0].map(Some).to_vec()
        );

        let repeats_closest_1: Vec<Option<i32>> =
            rows.iter().map(|r| r.slots[0].closest_repeat_count).collect();
        assert_eq!(repeats_closest_1, [35, 32, 45, 51, 30, 35, 45].map(Some).to_vec());

        let repeats_1: Vec<Option<i32>> = rows.iter().map(|r| r.slots[0].inferred_repeat_count).collect();
        assert_eq!(repeats_1, [35, 33, 51, 46, 30, 35, 42].map(Some).to_vec());

        assert_eq!(rows[0].inferred_repeat_counts(), [Some(35), Some(61), Some(21)]);
        assert_eq!(rows[1].inferred_repeat_counts(), [Some(33), Some(54), None]);
        assert_eq!(rows[4].inferred_repeat_counts(), [Some(30), Some(88), Some(30)]);
        assert_eq!(rows[6].inferred_repeat_counts(), [Some(42), Some(55), None]);
        assert_eq!(rows[0].slots[2].closest_size, Some(276.0));
        assert_eq!(rows[4].slots[2].closest_repeat_count, Some(30));
    }

    #[test]
    fn test_calibrate_out_of_tolerance_calls_nothing() {
        let mut controls = controls();
        controls[1].size1 = Some(294.0);

        let outcome = calibrate(&samples(), &controls, &references(), &CalibrationPolicy::default());

        match outcome {
            CalibrationOutcome::OutOfTolerance(validation) => {
                assert!(!validation.proceed);
                assert_eq!(validation.out_of_tolerance, vec!["CTRL2".to_string()]);
            }
            other => panic!("Expected OutOfTolerance, got {:?}", other),
        }
    }

    #[test]
    fn test_calibrate_is_deterministic() {
        let policy = CalibrationPolicy::default();
        let first = calibrate(&samples(), &controls(), &references(), &policy);
        let second = calibrate(&samples(), &controls(), &references(), &policy);
        assert_eq!(first, second);
        assert!(first.validation().proceed);
    }
}
