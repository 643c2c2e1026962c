//! Time-resolved Hertzsprung-Russell diagrams.
//!
//! A BPASS HR-diagram file holds, for each of the 51 log(age) bins, a
//! 100x100 histogram of the number of stars per (log T, second axis) cell,
//! split by surface hydrogen abundance. [`HrDiagram`] keeps the raw counts
//! and the counts weighted by the number of years covered by each age bin.

use std::fmt;
use std::ops::Index;

use ndarray::{s, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::constants::{
    log_g_bins, log_l_bins, log_t_bins, log_tg_bins, time_bin_index, time_intervals, BIN_WIDTH,
    HR_BINS, LOG_AGE_MAX, LOG_AGE_MIN, N_TIME_BINS,
};
use crate::error::{HokiError, Result};
use crate::grid::{AgeGrid, Grid2};

// ---------------------------------------------------------------------------
// Diagram kinds
// ---------------------------------------------------------------------------

/// Which pair of quantities a diagram bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HrType {
    /// log(T) vs log(L)
    TL,
    /// log(T) vs log(g)
    Tg,
    /// log(T) vs log(T^4/g)
    TTG,
}

impl HrType {
    pub const ALL: [HrType; 3] = [HrType::TL, HrType::Tg, HrType::TTG];

    /// Label of the second (non-temperature) axis.
    pub fn y_label(self) -> &'static str {
        match self {
            HrType::TL => "log(L/Lsun)",
            HrType::Tg => "log(g)",
            HrType::TTG => "log(T^4/g)",
        }
    }
}

impl fmt::Display for HrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HrType::TL => "TL",
            HrType::Tg => "Tg",
            HrType::TTG => "TTG",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for HrType {
    type Err = HokiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TL" => Ok(HrType::TL),
            "Tg" => Ok(HrType::Tg),
            "TTG" => Ok(HrType::TTG),
            other => Err(HokiError::Format(format!(
                "unknown HR diagram type '{other}', expected TL, Tg or TTG"
            ))),
        }
    }
}

/// Surface hydrogen abundance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Abundance {
    All,
    /// X > 0.4
    High,
    /// 1e-3 < X < 0.4
    Medium,
    /// X < 1e-3
    Low,
}

impl Abundance {
    pub const ALL: [Abundance; 4] = [
        Abundance::All,
        Abundance::High,
        Abundance::Medium,
        Abundance::Low,
    ];
}

impl fmt::Display for Abundance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Abundance::All => "all",
            Abundance::High => "high H (X > 0.4)",
            Abundance::Medium => "medium H (1e-3 < X < 0.4)",
            Abundance::Low => "low H (X < 1e-3)",
        };
        write!(f, "{s}")
    }
}

/// One 2-D diagram per abundance class, all at the same age (or age range).
#[derive(Debug, Clone, PartialEq)]
pub struct HrSlices {
    pub all: Grid2,
    pub high: Grid2,
    pub medium: Grid2,
    pub low: Grid2,
}

impl HrSlices {
    pub fn get(&self, abundance: Abundance) -> &Grid2 {
        match abundance {
            Abundance::All => &self.all,
            Abundance::High => &self.high,
            Abundance::Medium => &self.medium,
            Abundance::Low => &self.low,
        }
    }
}

// ---------------------------------------------------------------------------
// HrDiagram
// ---------------------------------------------------------------------------

/// Time-weighted HR diagrams for the three hydrogen abundance classes.
///
/// Grids are indexed `[time_bin, logT_bin, y_bin]`.
#[derive(Debug, Clone)]
pub struct HrDiagram {
    pub hr_type: HrType,
    /// log(T) bin centres (first grid axis).
    pub t_coord: Vec<f64>,
    /// Second-axis bin centres: log(L), log(g) or log(T^4/g).
    pub l_coord: Vec<f64>,
    high_unweighted: AgeGrid,
    medium_unweighted: AgeGrid,
    low_unweighted: AgeGrid,
    high: AgeGrid,
    medium: AgeGrid,
    low: AgeGrid,
    all: AgeGrid,
}

impl HrDiagram {
    /// Build a diagram from raw per-bin counts.
    ///
    /// Every input must be shaped `[51, 100, 100]`.
    pub fn new(high: AgeGrid, medium: AgeGrid, low: AgeGrid, hr_type: HrType) -> Result<Self> {
        for (name, grid) in [("high", &high), ("medium", &medium), ("low", &low)] {
            if grid.shape() != [N_TIME_BINS, HR_BINS, HR_BINS] {
                return Err(HokiError::Format(format!(
                    "{name} H grid has shape {:?}, expected [{N_TIME_BINS}, {HR_BINS}, {HR_BINS}]",
                    grid.shape()
                )));
            }
        }

        let high_w = apply_time_weighting(&high);
        let medium_w = apply_time_weighting(&medium);
        let low_w = apply_time_weighting(&low);
        let all = &high_w + &medium_w + &low_w;

        let l_coord = match hr_type {
            HrType::TL => log_l_bins(),
            HrType::Tg => log_g_bins(),
            HrType::TTG => log_tg_bins(),
        };

        Ok(Self {
            hr_type,
            t_coord: log_t_bins().to_vec(),
            l_coord: l_coord.to_vec(),
            high_unweighted: high,
            medium_unweighted: medium,
            low_unweighted: low,
            high: high_w,
            medium: medium_w,
            low: low_w,
            all,
        })
    }

    /// Time-weighted grid for an abundance class.
    pub fn grid(&self, abundance: Abundance) -> &AgeGrid {
        match abundance {
            Abundance::All => &self.all,
            Abundance::High => &self.high,
            Abundance::Medium => &self.medium,
            Abundance::Low => &self.low,
        }
    }

    /// Raw counts as read from the file. `All` sums the three classes.
    pub fn unweighted(&self, abundance: Abundance) -> AgeGrid {
        match abundance {
            Abundance::All => {
                &self.high_unweighted + &self.medium_unweighted + &self.low_unweighted
            }
            Abundance::High => self.high_unweighted.clone(),
            Abundance::Medium => self.medium_unweighted.clone(),
            Abundance::Low => self.low_unweighted.clone(),
        }
    }

    /// Summed diagram at a time bin.
    pub fn at_bin(&self, bin: usize) -> ArrayView2<'_, f64> {
        self.all.index_axis(Axis(0), bin)
    }

    /// The diagrams in the time bin containing `log_age`.
    pub fn at_log_age(&self, log_age: f64) -> HrSlices {
        let bin = time_bin_index(log_age);
        let take = |g: &AgeGrid| g.index_axis(Axis(0), bin).to_owned();
        HrSlices {
            all: take(&self.all),
            high: take(&self.high),
            medium: take(&self.medium),
            low: take(&self.low),
        }
    }

    /// Sum the diagrams over an age range.
    ///
    /// Limits may be log(age/yr) values in `[6, 11.1]` or ages in years
    /// (above 999 999), both in the same unit. Missing limits default to the
    /// ends of the grid.
    pub fn stack(&self, age_min: Option<f64>, age_max: Option<f64>) -> Result<HrSlices> {
        let (lo, hi) = log_age_range(age_min, age_max)?;
        let bin_min = stack_bin(lo);
        let bin_max = stack_bin(hi);
        log::debug!("stacking {} HRD bins {bin_min}..{bin_max}", self.hr_type);

        let sum = |g: &AgeGrid| g.slice(s![bin_min..bin_max, .., ..]).sum_axis(Axis(0));
        let high = sum(&self.high);
        let medium = sum(&self.medium);
        let low = sum(&self.low);
        let all = &high + &medium + &low;
        Ok(HrSlices {
            all,
            high,
            medium,
            low,
        })
    }

    /// Bin index of a log(T) value.
    pub fn t_index(&self, log_t: f64) -> usize {
        axis_index(log_t_bins()[0], log_t)
    }

    /// Bin index of a log(L) value.
    pub fn l_index(&self, log_l: f64) -> usize {
        axis_index(log_l_bins()[0], log_l)
    }

    /// Bin index of a log(g) value.
    pub fn g_index(&self, log_g: f64) -> usize {
        axis_index(log_g_bins()[0], log_g)
    }

    /// Bin index of a log(T^4/g) value.
    pub fn tg_index(&self, log_tg: f64) -> usize {
        axis_index(log_tg_bins()[0], log_tg)
    }
}

impl Index<[usize; 3]> for HrDiagram {
    type Output = f64;

    /// `hrd[[time_bin, t_bin, y_bin]]` on the summed, weighted grid.
    fn index(&self, idx: [usize; 3]) -> &f64 {
        &self.all[idx]
    }
}

fn apply_time_weighting(grid: &AgeGrid) -> AgeGrid {
    let dt = time_intervals();
    let mut weighted = grid.clone();
    for (mut slice, w) in weighted.axis_iter_mut(Axis(0)).zip(dt) {
        slice.mapv_inplace(|v| v * w);
    }
    weighted
}

fn axis_index(first: f64, value: f64) -> usize {
    let raw = ((value - first) / BIN_WIDTH).round();
    if raw.is_nan() || raw < 0.0 {
        0
    } else {
        (raw as usize).min(HR_BINS - 1)
    }
}

fn stack_bin(log_age: f64) -> usize {
    let raw = (10.0 * (log_age - LOG_AGE_MIN)).round();
    if raw < 0.0 {
        0
    } else {
        (raw as usize).min(N_TIME_BINS)
    }
}

/// Resolve stacking limits to log(age/yr).
///
/// Both limits must use the same unit: log ages or years, not one of each.
pub fn log_age_range(age_min: Option<f64>, age_max: Option<f64>) -> Result<(f64, f64)> {
    let lo = age_min.map(to_log_age).transpose()?;
    let hi = age_max.map(to_log_age).transpose()?;
    if let (Some((_, lo_years)), Some((_, hi_years))) = (lo, hi) {
        if lo_years != hi_years {
            return Err(HokiError::AgeRange(
                "age_min and age_max should both be log(age/yr) or both be years".to_string(),
            ));
        }
    }

    let lo = lo.map_or(LOG_AGE_MIN, |(v, _)| v);
    let hi = hi.map_or(LOG_AGE_MAX, |(v, _)| v);
    if lo >= hi {
        return Err(HokiError::AgeRange(format!(
            "age_max ({hi}) should be greater than age_min ({lo})"
        )));
    }
    Ok((lo, hi))
}

/// log(age) of a limit, and whether it was given in years.
fn to_log_age(age: f64) -> Result<(f64, bool)> {
    if (LOG_AGE_MIN..=LOG_AGE_MAX).contains(&age) {
        Ok((age, false))
    } else if age > 999_999.0 {
        log::info!("age {age} looks like it is in years, converting to log(age)");
        Ok((age.log10(), true))
    } else {
        Err(HokiError::AgeRange(format!(
            "{age} is neither a log(age) in [{LOG_AGE_MIN}, {LOG_AGE_MAX}] nor an age in years"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn shape() -> (usize, usize, usize) {
        (N_TIME_BINS, HR_BINS, HR_BINS)
    }

    fn ones_diagram() -> HrDiagram {
        let ones = Array3::<f64>::ones(shape());
        HrDiagram::new(ones.clone(), ones.clone() * 2.0, ones * 3.0, HrType::TL).unwrap()
    }

    #[test]
    fn rejects_wrong_shape() {
        let bad = Array3::<f64>::zeros((50, HR_BINS, HR_BINS));
        let ok = Array3::<f64>::zeros(shape());
        let err = HrDiagram::new(bad, ok.clone(), ok, HrType::TL).unwrap_err();
        assert!(matches!(err, HokiError::Format(_)));
    }

    #[test]
    fn weighting_multiplies_by_bin_duration() {
        let hrd = ones_diagram();
        let dt = time_intervals();
        assert!((hrd.grid(Abundance::High)[[3, 10, 10]] - dt[3]).abs() < 1e-6);
        assert!((hrd[[3, 10, 10]] - 6.0 * dt[3]).abs() < 1e-3);
        assert_eq!(hrd.unweighted(Abundance::All)[[0, 0, 0]], 6.0);
    }

    #[test]
    fn at_log_age_picks_the_rounded_bin() {
        let mut high = Array3::<f64>::zeros(shape());
        high[[10, 5, 7]] = 1.0;
        let zeros = Array3::<f64>::zeros(shape());
        let hrd = HrDiagram::new(high, zeros.clone(), zeros, HrType::TL).unwrap();
        let slices = hrd.at_log_age(6.96);
        let dt = time_intervals();
        assert!((slices.high[[5, 7]] - dt[10]).abs() < 1e-6);
        assert_eq!(slices.all, slices.high);
        assert_eq!(slices.low.sum(), 0.0);
    }

    #[test]
    fn stack_sums_requested_bins_only() {
        let hrd = ones_diagram();
        let dt = time_intervals();
        let stacked = hrd.stack(Some(6.0), Some(6.3)).unwrap();
        let expected: f64 = dt[0..3].iter().sum();
        assert!((stacked.high[[0, 0]] - expected).abs() < 1e-6);
        assert!((stacked.all[[0, 0]] - 6.0 * expected).abs() < 1e-3);
    }

    #[test]
    fn stacking_twice_gives_the_same_result() {
        let hrd = ones_diagram();
        let a = hrd.stack(Some(7.0), Some(8.0)).unwrap();
        let b = hrd.stack(Some(7.0), Some(8.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn full_stack_covers_every_bin() {
        let hrd = ones_diagram();
        let total: f64 = time_intervals().iter().sum();
        let stacked = hrd.stack(None, None).unwrap();
        assert!((stacked.high[[1, 1]] - total).abs() / total < 1e-12);
    }

    #[test]
    fn years_are_converted_to_logs() {
        let (lo, hi) = log_age_range(Some(1e7), Some(1e8)).unwrap();
        assert!((lo - 7.0).abs() < 1e-12);
        assert!((hi - 8.0).abs() < 1e-12);
    }

    #[test]
    fn bad_ranges_are_rejected() {
        assert!(matches!(
            log_age_range(Some(8.0), Some(7.0)),
            Err(HokiError::AgeRange(_))
        ));
        assert!(matches!(
            log_age_range(Some(500.0), None),
            Err(HokiError::AgeRange(_))
        ));
    }

    #[test]
    fn mixed_units_are_rejected() {
        assert!(matches!(
            log_age_range(Some(7.0), Some(1e9)),
            Err(HokiError::AgeRange(_))
        ));
        assert!(ones_diagram().stack(Some(1e7), Some(9.0)).is_err());
        let (lo, hi) = log_age_range(Some(1e7), None).unwrap();
        assert!((lo - 7.0).abs() < 1e-12);
        assert_eq!(hi, LOG_AGE_MAX);
    }

    #[test]
    fn axis_indices() {
        let hrd = ones_diagram();
        assert_eq!(hrd.t_index(0.1), 0);
        assert_eq!(hrd.t_index(4.0), 39);
        assert_eq!(hrd.l_index(-2.9), 0);
        assert_eq!(hrd.l_index(0.0), 29);
        assert_eq!(hrd.g_index(7.0), 99);
        assert_eq!(hrd.tg_index(50.0), 99);
    }

    #[test]
    fn hr_type_parses() {
        assert_eq!("Tg".parse::<HrType>().unwrap(), HrType::Tg);
        assert!("XY".parse::<HrType>().is_err());
    }
}
