// ==============================================================================
// matcher.rs - Nearest Reference Peak Matching
// ==============================================================================
// Description: Maps measured fragment sizes onto the closest calibrated size
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use crate::calibration::ReferencePeakSet;
use crate::models::PeakMatch;

/// Round a called size to whole size units (half away from zero)
///
/// Non-finite values are treated as uncalled.
pub fn normalize_size(size: Option<f64>) -> Option<f64> {
    size.filter(|s| s.is_finite()).map(f64::round)
}

/// Size in `sizes` closest to `x`
///
/// On equal distance the earlier entry wins. Returns `None` if `x` is absent
/// or `sizes` is empty.
pub fn closest_value(x: Option<f64>, sizes: &[f64]) -> Option<f64> {
    let x = x.filter(|v| !v.is_nan())?;

    let mut best: Option<(f64, f64)> = None;
    for &size in sizes {
        let distance = (size - x).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((size, distance)),
        }
    }

    best.map(|(size, _)| size)
}

/// Match a measured size against the reference peak set
pub fn match_peak(x: Option<f64>, reference_set: &ReferencePeakSet) -> Option<PeakMatch> {
    let closest_size = closest_value(x, reference_set.sizes())?;
    let closest_repeat_count = reference_set.repeat_count(closest_size)?;

    Some(PeakMatch {
        closest_size,
        closest_repeat_count,
    })
}
