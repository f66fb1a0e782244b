//! Path simplification and smoothing.
//!
//! Both functions are pure and work on any coordinate slice; the tracker's
//! recorded path is the usual input before display or export.

use crate::location::geo::perpendicular_distance;
use crate::location::Coordinate;

/// Default simplification tolerance in meters.
pub const DEFAULT_SIMPLIFY_TOLERANCE_METERS: f64 = 5.0;

/// Default smoothing window size.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// Simplifies a path with the Douglas-Peucker algorithm.
///
/// A point survives when it lies more than `tolerance_m` meters from the
/// chord of the span being examined. The first and last points are always
/// kept. A path of two points or fewer, or a tolerance that is not positive,
/// is returned unchanged.
///
/// # Examples
///
/// ```
/// use whereabouts_core::location::Coordinate;
/// use whereabouts_core::tracking::simplify;
///
/// let path = [
///     Coordinate::new(35.0, 139.0),
///     Coordinate::new(35.0005, 139.0),
///     Coordinate::new(35.001, 139.0),
/// ];
/// let simplified = simplify(&path, 5.0);
/// assert_eq!(simplified, vec![path[0], path[2]]);
/// ```
#[must_use]
pub fn simplify(path: &[Coordinate], tolerance_m: f64) -> Vec<Coordinate> {
    if path.len() <= 2 || tolerance_m.is_nan() || tolerance_m <= 0.0 {
        return path.to_vec();
    }

    let last = path.len() - 1;
    let mut keep = vec![false; path.len()];
    keep[0] = true;
    keep[last] = true;

    // Spans still to examine, as (first, last) index pairs.
    let mut spans = vec![(0, last)];
    while let Some((first, last)) = spans.pop() {
        if last <= first + 1 {
            continue;
        }

        let mut farthest = first;
        let mut max_distance = 0.0;
        for (index, point) in path.iter().enumerate().take(last).skip(first + 1) {
            let distance = perpendicular_distance(*point, path[first], path[last]);
            if distance > max_distance {
                farthest = index;
                max_distance = distance;
            }
        }

        if max_distance > tolerance_m {
            keep[farthest] = true;
            spans.push((first, farthest));
            spans.push((farthest, last));
        }
    }

    path.iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Smooths a path with a centered moving average.
///
/// Each output point averages latitude and longitude over indices
/// `[i - window/2, i + window/2]`, truncated at both ends. The output has the
/// same length as the input. A window of 0 returns the input unchanged.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn smooth(path: &[Coordinate], window: usize) -> Vec<Coordinate> {
    if window == 0 || path.is_empty() {
        return path.to_vec();
    }

    let half = window / 2;
    let last = path.len() - 1;

    (0..path.len())
        .map(|i| {
            let neighbors = &path[i.saturating_sub(half)..=(i + half).min(last)];
            let count = neighbors.len() as f64;
            let (lat_sum, lon_sum) = neighbors
                .iter()
                .fold((0.0, 0.0), |(lat, lon), point| {
                    (lat + point.latitude, lon + point.longitude)
                });
            Coordinate::new(lat_sum / count, lon_sum / count)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| Coordinate::new(35.0 + 0.001 * i as f64, 139.0))
            .collect()
    }

    #[test]
    fn simplify_short_paths_unchanged() {
        assert!(simplify(&[], 5.0).is_empty());
        let two = line(2);
        assert_eq!(simplify(&two, 5.0), two);
    }

    #[test]
    fn simplify_zero_tolerance_unchanged() {
        let path = line(5);
        assert_eq!(simplify(&path, 0.0), path);
        assert_eq!(simplify(&path, f64::NAN), path);
    }

    #[test]
    fn simplify_collinear_keeps_endpoints() {
        let path = line(10);
        assert_eq!(simplify(&path, 1.0), vec![path[0], path[9]]);
    }

    #[test]
    fn simplify_keeps_significant_corner() {
        // Roughly 111 m north, then 91 m east.
        let path = vec![
            Coordinate::new(35.0, 139.0),
            Coordinate::new(35.0005, 139.000_001),
            Coordinate::new(35.001, 139.0),
            Coordinate::new(35.001, 139.001),
        ];

        let simplified = simplify(&path, 5.0);

        assert_eq!(simplified, vec![path[0], path[2], path[3]]);
    }

    #[test]
    fn simplify_recurses_into_both_halves() {
        // Zigzag with 50 m swings; every turn exceeds a 10 m tolerance.
        let path: Vec<Coordinate> = (0..7)
            .map(|i| {
                let offset = if i % 2 == 0 { 0.0 } else { 0.000_45 };
                Coordinate::new(35.0 + 0.001 * f64::from(i), 139.0 + offset)
            })
            .collect();

        assert_eq!(simplify(&path, 10.0), path);
    }

    #[test]
    fn smooth_preserves_length() {
        let path = line(7);
        for window in 0..10 {
            assert_eq!(smooth(&path, window).len(), path.len());
        }
        assert!(smooth(&[], 3).is_empty());
    }

    #[test]
    fn smooth_window_one_is_identity() {
        let path = line(4);
        assert_eq!(smooth(&path, 1), path);
    }

    #[test]
    fn smooth_truncates_at_edges() {
        let path = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(3.0, 6.0),
            Coordinate::new(6.0, 0.0),
        ];

        let smoothed = smooth(&path, 3);

        assert_eq!(smoothed[0], Coordinate::new(1.5, 3.0));
        assert_eq!(smoothed[1], Coordinate::new(3.0, 2.0));
        assert_eq!(smoothed[2], Coordinate::new(4.5, 3.0));
    }

    #[test]
    fn smooth_window_larger_than_path() {
        let path = vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)];

        let smoothed = smooth(&path, 10);

        assert_eq!(smoothed, vec![Coordinate::new(2.0, 3.0); 2]);
    }
}
