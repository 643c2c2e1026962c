//! Resampling utilities for BPASS spectra.

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{HokiError, Result};

/// How to bin a wavelength axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Bins {
    /// This many equal-width bins spanning the whole axis.
    Count(usize),
    /// Explicit ascending bin edges.
    Edges(Vec<f64>),
}

/// Linear interpolation of `(x, y)` at `x_new`; NaN outside `x`.
///
/// `x` must be ascending.
pub fn interpolate(x: &[f64], y: &[f64], x_new: &[f64]) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(HokiError::Format(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if !is_ascending(x) {
        return Err(HokiError::Format("x must be strictly ascending".into()));
    }
    Ok(x_new.iter().map(|&v| interp_one(x, y, v)).collect())
}

fn interp_one(x: &[f64], y: &[f64], v: f64) -> f64 {
    let (Some(&first), Some(&last)) = (x.first(), x.last()) else {
        return f64::NAN;
    };
    if v.is_nan() || v < first || v > last {
        return f64::NAN;
    }
    let hi = x.partition_point(|&xi| xi < v);
    if hi == 0 {
        return y[0];
    }
    if x[hi] == v {
        return y[hi];
    }
    let lo = hi - 1;
    let frac = (v - x[lo]) / (x[hi] - x[lo]);
    y[lo] + frac * (y[hi] - y[lo])
}

fn is_ascending(x: &[f64]) -> bool {
    x.windows(2).all(|w| w[0] < w[1])
}

/// Average luminosity per wavelength bin.
///
/// `luminosity` is `[n_wavelengths, n_columns]` (one column per age, as
/// loaded from a spectra file). Each bin is integrated with the trapezoid
/// rule, interpolating at the bin edges, and divided by its width.
/// Returns the bin centres and a `[n_bins, n_columns]` array.
pub fn bin_luminosity(
    wavelength: &[f64],
    luminosity: ArrayView2<'_, f64>,
    bins: &Bins,
) -> Result<(Vec<f64>, Array2<f64>)> {
    if luminosity.nrows() != wavelength.len() {
        return Err(HokiError::Format(format!(
            "{} wavelengths but {} luminosity rows",
            wavelength.len(),
            luminosity.nrows()
        )));
    }
    if wavelength.len() < 2 || !is_ascending(wavelength) {
        return Err(HokiError::Format(
            "wavelength must have at least two strictly ascending values".into(),
        ));
    }
    let lo = wavelength[0];
    let hi = wavelength[wavelength.len() - 1];

    let edges: Vec<f64> = match bins {
        Bins::Count(0) => return Err(HokiError::Format("need at least one bin".into())),
        Bins::Count(n) => {
            let width = (hi - lo) / *n as f64;
            (0..=*n).map(|i| lo + i as f64 * width).collect()
        }
        Bins::Edges(e) => e.clone(),
    };
    if edges.len() < 2 || !is_ascending(&edges) {
        return Err(HokiError::Format("bin edges must be strictly ascending".into()));
    }
    if edges[0] < lo || edges[edges.len() - 1] > hi {
        return Err(HokiError::Format(format!(
            "bin edges must lie within the wavelength range [{lo}, {hi}]"
        )));
    }

    let centres: Vec<f64> = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    let mut binned = Array2::zeros((centres.len(), luminosity.ncols()));

    for (c, column) in luminosity.axis_iter(Axis(1)).enumerate() {
        let y = column.to_vec();
        for (b, w) in edges.windows(2).enumerate() {
            let (e0, e1) = (w[0], w[1]);
            let mut xs = vec![e0];
            let mut ys = vec![interp_one(wavelength, &y, e0)];
            for (&xi, &yi) in wavelength.iter().zip(&y) {
                if xi > e0 && xi < e1 {
                    xs.push(xi);
                    ys.push(yi);
                }
            }
            xs.push(e1);
            ys.push(interp_one(wavelength, &y, e1));

            let area: f64 = xs
                .windows(2)
                .zip(ys.windows(2))
                .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
                .sum();
            binned[[b, c]] = area / (e1 - e0);
        }
    }

    Ok((centres, binned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn interpolates_between_points() {
        let out = interpolate(&[0.0, 1.0, 2.0], &[0.0, 10.0, 0.0], &[0.5, 1.0, 1.5, 3.0]).unwrap();
        assert_eq!(out[0], 5.0);
        assert_eq!(out[1], 10.0);
        assert_eq!(out[2], 5.0);
        assert!(out[3].is_nan());
    }

    #[test]
    fn rejects_unsorted_x() {
        assert!(interpolate(&[1.0, 0.0], &[0.0, 0.0], &[0.5]).is_err());
    }

    #[test]
    fn flat_spectrum_bins_to_its_value() {
        let wl = [1.0, 2.0, 3.0, 4.0, 5.0];
        let lum = array![[2.0, 1.0], [2.0, 1.0], [2.0, 1.0], [2.0, 1.0], [2.0, 1.0]];
        let (centres, binned) = bin_luminosity(&wl, lum.view(), &Bins::Count(2)).unwrap();
        assert_eq!(centres, vec![2.0, 4.0]);
        for v in binned.column(0) {
            assert!((v - 2.0).abs() < 1e-12);
        }
        for v in binned.column(1) {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_spectrum_averages_to_centre_value() {
        let wl = [0.0, 1.0, 2.0, 3.0, 4.0];
        let lum = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let (_, binned) =
            bin_luminosity(&wl, lum.view(), &Bins::Edges(vec![0.5, 2.5, 3.0])).unwrap();
        assert!((binned[[0, 0]] - 1.5).abs() < 1e-12);
        assert!((binned[[1, 0]] - 2.75).abs() < 1e-12);
    }

    #[test]
    fn edges_outside_range_are_rejected() {
        let wl = [0.0, 1.0];
        let lum = array![[0.0], [1.0]];
        assert!(bin_luminosity(&wl, lum.view(), &Bins::Edges(vec![-1.0, 1.0])).is_err());
        assert!(bin_luminosity(&wl, lum.view(), &Bins::Count(0)).is_err());
    }
}
