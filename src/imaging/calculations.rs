//! Pure calculation functions for the budget search.
//!
//! All functions here are pure and testable without any I/O or images:
//! dimension math for the clamp and fallback steps, and the quality step
//! policy.

use super::backend::Dimensions;
use super::params::Quality;

/// Smallest long edge the dimension fallback will shrink to.
pub const MIN_DIMENSION: u32 = 64;

/// Scale `source` so its long edge equals `long_edge`, preserving aspect ratio.
///
/// The short edge is rounded to the nearest pixel and never drops below 1.
///
/// # Examples
/// ```
/// # use imgbudget::imaging::{Dimensions, fit_long_edge};
/// // 3000x2000 landscape to a 1024 long edge → 1024x683
/// let fitted = fit_long_edge(Dimensions { width: 3000, height: 2000 }, 1024);
/// assert_eq!(fitted, Dimensions { width: 1024, height: 683 });
/// ```
pub fn fit_long_edge(source: Dimensions, long_edge: u32) -> Dimensions {
    let Dimensions { width, height } = source;
    if width >= height {
        let ratio = long_edge as f64 / width as f64;
        Dimensions {
            width: long_edge,
            height: ((height as f64 * ratio).round() as u32).max(1),
        }
    } else {
        let ratio = long_edge as f64 / height as f64;
        Dimensions {
            width: ((width as f64 * ratio).round() as u32).max(1),
            height: long_edge,
        }
    }
}

/// Dimensions for the pre-pass clamp, or `None` when the source already fits.
///
/// Never upscales: a source whose long edge is at or below `max_dimension`
/// is left alone.
pub fn clamp_dimensions(source: Dimensions, max_dimension: u32) -> Option<Dimensions> {
    if source.long_edge() > max_dimension {
        Some(fit_long_edge(source, max_dimension))
    } else {
        None
    }
}

/// Next quality to try after `current` overshot the byte budget.
///
/// Halves the remaining distance to the floor of 1: `1 + (q - 1) / 2`.
/// Strictly decreasing, reaches the floor in at most 8 attempts from 100.
/// Returns `None` once the floor itself has been tried.
pub fn next_quality(current: Quality) -> Option<Quality> {
    if current.is_floor() {
        return None;
    }
    Some(Quality::new(1 + (current.value() - 1) / 2))
}

/// The full sequence of qualities one search pass may visit.
pub fn quality_schedule(initial: Quality) -> Vec<Quality> {
    std::iter::successors(Some(initial), |q| next_quality(*q)).collect()
}

/// Long edge for the next dimension fallback, or `None` at the floor.
///
/// Halves the current long edge, bounded below by `floor`. A raster that is
/// already at or under the floor has no further fallback.
pub fn next_fallback_edge(current_long_edge: u32, floor: u32) -> Option<u32> {
    if current_long_edge <= floor {
        return None;
    }
    Some((current_long_edge / 2).max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // =========================================================================
    // fit_long_edge / clamp_dimensions
    // =========================================================================

    #[test]
    fn fit_landscape() {
        assert_eq!(fit_long_edge(dims(3000, 2000), 1024), dims(1024, 683));
    }

    #[test]
    fn fit_portrait() {
        assert_eq!(fit_long_edge(dims(1500, 2000), 1000), dims(750, 1000));
    }

    #[test]
    fn fit_square() {
        assert_eq!(fit_long_edge(dims(4000, 4000), 2000), dims(2000, 2000));
    }

    #[test]
    fn fit_extreme_panorama_keeps_one_pixel() {
        // 10000x10 → long edge 64: 10 * 0.0064 = 0.064 rounds to 0, clamped to 1
        assert_eq!(fit_long_edge(dims(10000, 10), 64), dims(64, 1));
    }

    #[test]
    fn clamp_skips_images_that_fit() {
        assert_eq!(clamp_dimensions(dims(400, 300), 1024), None);
        assert_eq!(clamp_dimensions(dims(1024, 768), 1024), None);
    }

    #[test]
    fn clamp_oversized_to_max_dimension() {
        assert_eq!(
            clamp_dimensions(dims(3000, 2000), 1024),
            Some(dims(1024, 683))
        );
        assert_eq!(
            clamp_dimensions(dims(2000, 3000), 1024),
            Some(dims(683, 1024))
        );
    }

    // =========================================================================
    // Quality policy
    // =========================================================================

    #[test]
    fn quality_halves_toward_floor() {
        let values: Vec<u32> = quality_schedule(Quality::new(80))
            .into_iter()
            .map(Quality::value)
            .collect();
        assert_eq!(values, vec![80, 40, 20, 10, 5, 3, 2, 1]);
    }

    #[test]
    fn quality_schedule_from_max_is_bounded() {
        let schedule = quality_schedule(Quality::MAX);
        assert!(schedule.len() <= 8);
        assert_eq!(schedule.last(), Some(&Quality::MIN));
    }

    #[test]
    fn quality_schedule_is_strictly_decreasing_for_every_start() {
        for start in 1..=100 {
            let schedule = quality_schedule(Quality::new(start));
            assert!(
                schedule.windows(2).all(|w| w[1] < w[0]),
                "schedule from {start} not strictly decreasing: {schedule:?}"
            );
            assert_eq!(schedule.last(), Some(&Quality::MIN));
        }
    }

    #[test]
    fn no_quality_below_floor() {
        assert_eq!(next_quality(Quality::MIN), None);
        assert_eq!(next_quality(Quality::new(2)), Some(Quality::MIN));
    }

    // =========================================================================
    // Dimension fallback
    // =========================================================================

    #[test]
    fn fallback_halves_long_edge() {
        assert_eq!(next_fallback_edge(2000, MIN_DIMENSION), Some(1000));
        assert_eq!(next_fallback_edge(1000, MIN_DIMENSION), Some(500));
    }

    #[test]
    fn fallback_bottoms_out_at_floor() {
        assert_eq!(next_fallback_edge(125, MIN_DIMENSION), Some(64));
        assert_eq!(next_fallback_edge(100, MIN_DIMENSION), Some(64));
        assert_eq!(next_fallback_edge(64, MIN_DIMENSION), None);
    }

    #[test]
    fn fallback_never_applies_to_tiny_images() {
        assert_eq!(next_fallback_edge(40, MIN_DIMENSION), None);
    }

    #[test]
    fn fallback_chain_from_2000() {
        let chain: Vec<u32> =
            std::iter::successors(Some(2000), |e| next_fallback_edge(*e, MIN_DIMENSION)).collect();
        assert_eq!(chain, vec![2000, 1000, 500, 250, 125, 64]);
    }
}
