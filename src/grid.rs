//! Binning helpers shared by the HR-diagram and CMD grids.

use ndarray::{Array2, Array3};

/// A stack of 2-D histograms indexed by time bin: `[time, x, y]`.
pub type AgeGrid = Array3<f64>;

/// A single 2-D histogram: `[x, y]`.
pub type Grid2 = Array2<f64>;

/// Evenly spaced axis from `start` (inclusive) to `stop` (exclusive).
///
/// Matches `numpy.arange`: the length is `ceil((stop - start) / step)`.
pub fn regular_axis(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    // Tolerance keeps 24.0 / 0.1 from producing a spurious 241st element.
    let n = ((stop - start) / step - 1e-9).ceil() as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Index of the axis value closest to `value`. The first minimum wins.
///
/// Returns `None` for an empty axis or a NaN value.
pub fn nearest_index(axis: &[f64], value: f64) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, &a) in axis.iter().enumerate() {
        let d = (a - value).abs();
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Like [`nearest_index`], but rejects values lying more than half a bin
/// beyond either end of a regular axis.
pub fn nearest_index_within(axis: &[f64], value: f64) -> Option<usize> {
    let (first, last) = (*axis.first()?, *axis.last()?);
    let half = if axis.len() > 1 {
        (axis[1] - axis[0]).abs() / 2.0
    } else {
        0.0
    };
    let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
    if value < lo - half || value > hi + half {
        return None;
    }
    nearest_index(axis, value)
}
