// ==============================================================================
// control_validator.rs - Control Peak Tolerance Check
// ==============================================================================
// Description: Joins run controls to the reference table and gates inference
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::models::{CalibrationPolicy, MeasurementRecord, ReferencePeak, ValidatedControl};

// Absorbs representation error in expected - measured (e.g. 291.7 - 288.7)
const TOLERANCE_EPSILON: f64 = 1e-9;

/// Result of checking the run's controls against the reference table
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValidation {
    /// Controls that have a reference entry, in run order
    pub validated: Vec<ValidatedControl>,

    /// Source ids of controls dropped by the join (no reference entry)
    pub unmatched: Vec<String>,

    /// Reference ids of validated controls outside the tolerance window
    pub out_of_tolerance: Vec<String>,

    /// Whether repeat inference may run
    pub proceed: bool,
}

/// Check a single expected - measured difference against the closed window
pub fn within_tolerance(diff: Option<f64>, tolerance: f64) -> bool {
    match diff {
        Some(d) if d.is_finite() => d.abs() <= tolerance + TOLERANCE_EPSILON,
        // An uncalled control peak cannot be confirmed
        _ => false,
    }
}

/// Validate run controls against the expected reference peaks
///
/// Controls are inner-joined to `references` on `reference_id` ==
/// `reference_sample_id`. Controls without a reference entry are reported in
/// `unmatched` and take no part in the tolerance check. If nothing joins, the
/// run proceeds.
pub fn validate_controls(
    controls: &[MeasurementRecord],
    references: &[ReferencePeak],
    policy: &CalibrationPolicy,
) -> ControlValidation {
    let mut lookup: HashMap<&str, &ReferencePeak> = HashMap::new();
    for reference in references {
        // First entry wins if the table repeats an id
        lookup
            .entry(reference.reference_sample_id.as_str())
            .or_insert(reference);
    }

    let mut validated = Vec::new();
    let mut unmatched = Vec::new();

    for control in controls {
        let reference = control
            .reference_id
            .as_deref()
            .and_then(|id| lookup.get(id));

        match reference {
            Some(reference) => validated.push(ValidatedControl::join(control, reference)),
            None => {
                warn!(
                    "Control {} has no reference entry and is excluded from validation",
                    control.source_id
                );
                unmatched.push(control.source_id.clone());
            }
        }
    }

    if validated.is_empty() {
        warn!("No run controls matched the reference table; tolerance check skipped");
        return ControlValidation {
            validated,
            unmatched,
            out_of_tolerance: Vec::new(),
            proceed: true,
        };
    }

    let mut out_of_tolerance = Vec::new();
    for control in &validated {
        let peak1_ok = within_tolerance(control.diff1(), policy.tolerance);
        let peak2_ok = within_tolerance(control.diff2(), policy.tolerance);

        debug!(
            "Control {}: diff1={:?} diff2={:?} (tolerance ±{})",
            control.reference_sample_id,
            control.diff1(),
            control.diff2(),
            policy.tolerance
        );

        if !(peak1_ok && peak2_ok) {
            out_of_tolerance.push(control.reference_sample_id.clone());
        }
    }

    let proceed = out_of_tolerance.is_empty();

    info!(
        "Validated {} controls ({} unmatched, {} out of tolerance)",
        validated.len(),
        unmatched.len(),
        out_of_tolerance.len()
    );

    ControlValidation {
        validated,
        unmatched,
        out_of_tolerance,
        proceed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(reference_id: &str, size1: f64, size2: f64) -> MeasurementRecord {
        MeasurementRecord {
            source_id: format!("B01_Normal_{}_run.fsa", reference_id),
            sample_id: "Normal".to_string(),
            reference_id: Some(reference_id.to_string()),
            size1: Some(size1),
            size2: Some(size2),
            size3: None,
        }
    }

    fn reference(id: &str, expected1: f64, expected2: f64) -> ReferencePeak {
        ReferencePeak {
            reference_sample_id: id.to_string(),
            expected_size1: expected1,
            expected_size2: expected2,
            repeat_count1: 30,
            repeat_count2: 51,
        }
    }

    #[test]
    fn test_within_tolerance_boundaries() {
        assert!(within_tolerance(Some(3.0), 3.0));
        assert!(within_tolerance(Some(-3.0), 3.0));
        assert!(within_tolerance(Some(0.0), 3.0));
        assert!(!within_tolerance(Some(3.01), 3.0));
        assert!(!within_tolerance(Some(-3.01), 3.0));
        assert!(!within_tolerance(None, 3.0));
        assert!(!within_tolerance(Some(f64::NAN), 3.0));
    }

    #[test]
    fn test_all_controls_within_tolerance() {
        let controls = vec![control("CTRL1", 288.7, 375.8), control("CTRL2", 297.4, 323.0)];
        let references = vec![reference("CTRL1", 289.0, 376.0), reference("CTRL2", 299.0, 325.0)];

        let result = validate_controls(&controls, &references, &CalibrationPolicy::default());

        assert!(result.proceed);
        assert_eq!(result.validated.len(), 2);
        assert!(result.unmatched.is_empty());
        assert!(result.out_of_tolerance.is_empty());
    }

    #[test]
    fn test_exact_tolerance_passes() {
        let controls = vec![control("CTRL1", 286.0, 379.0)];
        let references = vec![reference("CTRL1", 289.0, 376.0)];

        let result = validate_controls(&controls, &references, &CalibrationPolicy::default());
        assert!(result.proceed);
    }

    #[test]
    fn test_fractional_exact_tolerance_passes() {
        let controls = vec![control("CTRL1", 288.7, 379.1)];
        let references = vec![reference("CTRL1", 291.7, 376.1)];

        let result = validate_controls(&controls, &references, &CalibrationPolicy::default());
        assert!(result.proceed);
        assert!(result.out_of_tolerance.is_empty());
    }

    #[test]
    fn test_single_control_out_of_tolerance_blocks_run() {
        let controls = vec![control("CTRL1", 288.7, 375.8), control("CTRL2", 295.99, 325.0)];
        let references = vec![reference("CTRL1", 289.0, 376.0), reference("CTRL2", 299.0, 325.0)];

        let result = validate_controls(&controls, &references, &CalibrationPolicy::default());

        assert!(!result.proceed);
        assert_eq!(result.out_of_tolerance, vec!["CTRL2".to_string()]);
        // Failing controls are still reported as validated (joined)
        assert_eq!(result.validated.len(), 2);
    }

    #[test]
    fn test_second_peak_out_of_tolerance() {
        let controls = vec![control("CTRL1", 289.0, 372.99)];
        let references = vec![reference("CTRL1", 289.0, 376.0)];

        let result = validate_controls(&controls, &references, &CalibrationPolicy::default());
        assert!(!result.proceed);
    }

    #[test]
    fn test_unmatched_control_is_dropped() {
        // CTRL9 is far out of tolerance but has no reference entry
        let controls = vec![control("CTRL1", 288.7, 375.8), control("CTRL9", 100.0, 100.0)];
        let references = vec![reference("CTRL1", 289.0, 376.0)];

        let result = validate_controls(&controls, &references, &CalibrationPolicy::default());

        assert!(result.proceed);
        assert_eq!(result.validated.len(), 1);
        assert_eq!(result.unmatched, vec!["B01_Normal_CTRL9_run.fsa".to_string()]);
    }

    #[test]
    fn test_control_without_reference_id_is_unmatched() {
        let mut orphan = control("CTRL1", 288.7, 375.8);
        orphan.reference_id = None;
        let references = vec![reference("CTRL1", 289.0, 376.0)];

        let result = validate_controls(&[orphan], &references, &CalibrationPolicy::default());
        assert!(result.validated.is_empty());
        assert_eq!(result.unmatched.len(), 1);
    }

    #[test]
    fn test_no_matched_controls_proceeds() {
        let result = validate_controls(&[], &[reference("CTRL1", 289.0, 376.0)], &CalibrationPolicy::default());
        assert!(result.proceed);
        assert!(result.validated.is_empty());
    }

    #[test]
    fn test_uncalled_control_peak_fails() {
        let mut partial = control("CTRL1", 288.7, 375.8);
        partial.size2 = None;
        let references = vec![reference("CTRL1", 289.0, 376.0)];

        let result = validate_controls(&[partial], &references, &CalibrationPolicy::default());
        assert!(!result.proceed);
    }

    #[test]
    fn test_custom_tolerance() {
        let controls = vec![control("CTRL1", 288.0, 376.0)];
        let references = vec![reference("CTRL1", 289.5, 376.0)];
        let strict = CalibrationPolicy {
            tolerance: 1.0,
            ..CalibrationPolicy::default()
        };

        let result = validate_controls(&controls, &references, &strict);
        assert!(!result.proceed);
    }
}
