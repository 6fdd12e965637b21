// ==============================================================================
// reference_set.rs - Unified Reference Peak Set
// ==============================================================================
// Description: Flattens validated control peaks into one size -> repeats lookup
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::ValidatedControl;

/// Calibrated (size, repeat count) pairs for one gene/run
///
/// Sizes are rounded to whole size units (half away from zero). `sizes()`
/// keeps first-insertion order, which is also the tie-break order used by the
/// nearest-peak matcher. When a size is inserted twice the later repeat count
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePeakSet {
    sizes: Vec<f64>,
    repeats: HashMap<i64, i32>,
}

impl ReferencePeakSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set from validated controls
    ///
    /// Peak 1 of every control is inserted first (in control order), then
    /// peak 2 of every control. Uncalled peaks are skipped.
    pub fn from_controls(controls: &[ValidatedControl]) -> Self {
        let mut set = Self::new();

        let peak1 = controls
            .iter()
            .map(|c| (c.measured_size1, c.repeat_count1, &c.reference_sample_id));
        let peak2 = controls
            .iter()
            .map(|c| (c.measured_size2, c.repeat_count2, &c.reference_sample_id));

        for (size, repeat_count, reference_id) in peak1.chain(peak2) {
            let Some(size) = size else {
                debug!("Control {} has an uncalled peak, skipping", reference_id);
                continue;
            };

            if let Some(previous) = set.insert(size, repeat_count) {
                if previous != repeat_count {
                    warn!(
                        "Calibration size {} maps to {} repeats and {} repeats; using {} from control {}",
                        size.round(),
                        previous,
                        repeat_count,
                        repeat_count,
                        reference_id
                    );
                }
            }
        }

        debug!("Reference peak set: {:?}", set.sizes);
        set
    }

    /// Insert a pair, returning the repeat count it replaced
    pub fn insert(&mut self, size: f64, repeat_count: i32) -> Option<i32> {
        let rounded = size.round();
        let key = rounded as i64;

        let previous = self.repeats.insert(key, repeat_count);
        if previous.is_none() {
            self.sizes.push(rounded);
        }
        previous
    }

    /// Unique calibrated sizes in first-insertion order
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// Repeat count for a size in the set
    pub fn repeat_count(&self, size: f64) -> Option<i32> {
        if !size.is_finite() {
            return None;
        }
        self.repeats.get(&(size.round() as i64)).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}
