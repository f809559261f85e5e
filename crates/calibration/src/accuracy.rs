//! Accuracy measurement scoring
//!
//! Each buffered gaze point scores `100 - d / h * 100` where `d` is its
//! distance to the fixation target (viewport center) and `h` is half the
//! viewport height; points farther than `h` score 0. The accuracy is the
//! rounded mean. Width is not used, on either axis.

use gaze_source::{ScreenPoint, Viewport};

/// Precision of a single point at `distance` from the target (0.0..=100.0)
pub fn precision(distance: f64, half_height: f64) -> f64 {
    if !(half_height > 0.0) || !distance.is_finite() {
        return 0.0;
    }
    if distance <= half_height {
        (100.0 - distance / half_height * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Accuracy percent for `points` fixating the center of `viewport`.
///
/// An empty buffer scores 0.
pub fn compute_accuracy(points: &[ScreenPoint], viewport: Viewport) -> u8 {
    if points.is_empty() {
        return 0;
    }

    let target = viewport.center();
    let half_height = viewport.height / 2.0;
    let total: f64 = points
        .iter()
        .map(|p| precision(p.distance_to(&target), half_height))
        .sum();

    (total / points.len() as f64).round().clamp(0.0, 100.0) as u8
}
