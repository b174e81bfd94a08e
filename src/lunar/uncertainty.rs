//! Confidence of resolved boundaries.
//!
//! A boundary is resolved from an instant known only to within a margin. If
//! the margin window around the instant reaches past a point where the
//! decision would flip, the share of the window past that point is the
//! probability that the true boundary falls one unit (day or month) off.

use serde::{Deserialize, Serialize};

/// Which way the true boundary more likely lies.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Skew {
    Earlier,
    Later,
}

/// Chance that a computed boundary is one unit off.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uncertainty {
    /// `0..=100`.
    pub probability_percent: f64,
    pub direction: Skew,
    pub margin_hours: f64,
}

/// Estimates how likely a decision made at `value` flips.
///
/// `value` is known within `±half_width`; the decision flips if the true
/// value is at or below `earlier` (the boundary moves earlier) or at or above
/// `later` (it moves later). `margin_hours` is reported on the result as is.
///
/// Returns `None` when the window stays strictly between the two points.
///
/// # Example
///
/// ```
/// use lunkalendaro::lunar::uncertainty::{estimate, Skew};
///
/// // An event 3h before the next day start, known to ±4h.
/// let u = estimate(0.0, 4.0, -20.0, 3.0, 4.0).unwrap();
/// assert_eq!(Skew::Later, u.direction);
/// assert_eq!(12.5, u.probability_percent);
///
/// assert_eq!(None, estimate(0.0, 1.0, -20.0, 3.0, 1.0));
/// ```
pub fn estimate(
    value: f64,
    half_width: f64,
    earlier: f64,
    later: f64,
    margin_hours: f64,
) -> Option<Uncertainty> {
    if !(half_width > 0.0) {
        return None;
    }
    let width = 2.0 * half_width;
    let below = (earlier - (value - half_width)).clamp(0.0, width);
    let above = ((value + half_width) - later).clamp(0.0, width);
    if below == 0.0 && above == 0.0 {
        return None;
    }
    let (share, direction) = if above >= below {
        (above, Skew::Later)
    } else {
        (below, Skew::Earlier)
    };
    Some(Uncertainty {
        probability_percent: (share / width * 1000.0).round() / 10.0,
        direction,
        margin_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straddling() {
        // Window [-2, 2] reaches 1 unit below `earlier = -1`.
        let u = estimate(0.0, 2.0, -1.0, 10.0, 2.0).unwrap();
        assert_eq!(Skew::Earlier, u.direction);
        assert_eq!(25.0, u.probability_percent);
        assert_eq!(2.0, u.margin_hours);

        // Both sides reached, the larger share wins.
        let u = estimate(0.0, 2.0, -1.5, 0.5, 2.0).unwrap();
        assert_eq!(Skew::Later, u.direction);
        assert_eq!(37.5, u.probability_percent);

        // A window entirely past a point is certain.
        let u = estimate(0.0, 1.0, -5.0, -3.0, 1.0).unwrap();
        assert_eq!(100.0, u.probability_percent);
    }

    #[test]
    fn no_straddle() {
        assert_eq!(None, estimate(0.0, 1.0, -1.0, 1.0, 1.0));
        assert_eq!(None, estimate(0.0, 0.0, -1.0, 1.0, 0.0));
        assert_eq!(None, estimate(0.0, f64::NAN, -1.0, 1.0, 0.0));
    }
}
