//! Age estimation of observed sources against BPASS HR diagrams or CMDs.
//!
//! Each source is placed on the model grid at the cell closest to its
//! observed coordinates. Reading that cell across the 51 time bins and
//! normalising gives the source's age probability distribution; the
//! distributions of a population can then be multiplied together.

use std::path::Path;

use anyhow::Context;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::cmd::Cmd;
use crate::constants::{time_bins, N_TIME_BINS};
use crate::data::model::ObservationTable;
use crate::error::{HokiError, Result};
use crate::grid::nearest_index;
use crate::hrdiagrams::{HrDiagram, HrType};

// ---------------------------------------------------------------------------
// Model abstraction
// ---------------------------------------------------------------------------

/// A time-resolved 2-D model grid sources can be located on.
pub trait AgeModel {
    /// Observation columns matching the first and second grid axes.
    fn coordinate_columns(&self) -> [&'static str; 2];

    /// Bin centres of the first and second grid axes.
    fn axes(&self) -> [&[f64]; 2];

    /// Grid value at time bin `t`, cell `(i, j)`.
    fn value(&self, t: usize, i: usize, j: usize) -> f64;
}

impl AgeModel for HrDiagram {
    fn coordinate_columns(&self) -> [&'static str; 2] {
        match self.hr_type {
            HrType::TL => ["logT", "logL"],
            HrType::Tg => ["logT", "logg"],
            HrType::TTG => ["logT", "logTG"],
        }
    }

    fn axes(&self) -> [&[f64]; 2] {
        [&self.t_coord, &self.l_coord]
    }

    fn value(&self, t: usize, i: usize, j: usize) -> f64 {
        self[[t, i, j]]
    }
}

impl AgeModel for Cmd {
    fn coordinate_columns(&self) -> [&'static str; 2] {
        ["mag", "col"]
    }

    fn axes(&self) -> [&[f64]; 2] {
        [&self.mag_range, &self.col_range]
    }

    fn value(&self, t: usize, i: usize, j: usize) -> f64 {
        self[[t, i, j]]
    }
}

/// Load a model from disk: HR-diagram files (name containing `hrs`) as
/// TL diagrams, anything else as a CMD saved with [`Cmd::save`].
pub fn load_model(path: &Path) -> anyhow::Result<Box<dyn AgeModel>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    if name.contains("hrs") {
        let hrd = crate::data::loader::hr_diagram(path, HrType::TL)?;
        Ok(Box::new(hrd))
    } else {
        let cmd = Cmd::load(path)
            .with_context(|| format!("{} is neither an HR diagram file nor a saved CMD", path.display()))?;
        Ok(Box::new(cmd))
    }
}

// ---------------------------------------------------------------------------
// Coordinates and distributions
// ---------------------------------------------------------------------------

/// Grid cell closest to each observed source, `None` where a coordinate
/// is missing or not numeric.
pub fn find_coordinates(
    obs: &ObservationTable,
    model: &dyn AgeModel,
) -> Result<Vec<Option<(usize, usize)>>> {
    let [c1, c2] = model.coordinate_columns();
    for col in [c1, c2] {
        if !obs.has_column(col) {
            return Err(HokiError::Format(format!(
                "observations should have a '{c1}' and a '{c2}' column"
            )));
        }
    }
    let [axis1, axis2] = model.axes();

    let locate = |row: usize, col: &str, axis: &[f64]| -> Option<usize> {
        let cell = obs.value(row, col);
        match cell.as_f64() {
            Some(v) if v.is_nan() => {
                log::warn!("{col} is NaN for row {row}, no model coordinate");
                None
            }
            Some(v) => nearest_index(axis, v),
            None => {
                log::warn!("{col}={cell} cannot be converted to a number");
                None
            }
        }
    };

    Ok((0..obs.len())
        .map(|row| {
            let i = locate(row, c1, axis1);
            let j = locate(row, c2, axis2);
            i.zip(j)
        })
        .collect())
}

/// Divide by the sum. An all-zero distribution stays all zeros.
pub fn normalise_1d(distribution: ArrayView1<'_, f64>) -> Array1<f64> {
    let area = distribution.sum();
    if area == 0.0 || !area.is_finite() {
        return Array1::zeros(distribution.len());
    }
    distribution.mapv(|v| v / area)
}

/// Per-source age probability distributions.
#[derive(Debug, Clone)]
pub struct PdfTable {
    pub sources: Vec<String>,
    pub time_bins: Vec<f64>,
    /// `[time_bin, source]`
    pub values: Array2<f64>,
}

impl PdfTable {
    pub fn column(&self, source: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.sources.iter().position(|s| s == source)?;
        Some(self.values.index_axis(Axis(1), idx))
    }
}

/// Age distribution of every observed source.
pub fn calculate_pdfs(obs: &ObservationTable, model: &dyn AgeModel) -> Result<PdfTable> {
    let coordinates = find_coordinates(obs, model)?;
    Ok(pdfs_from_coordinates(obs.source_names(), &coordinates, model))
}

fn pdfs_from_coordinates(
    sources: Vec<String>,
    coordinates: &[Option<(usize, usize)>],
    model: &dyn AgeModel,
) -> PdfTable {
    let mut values = Array2::zeros((N_TIME_BINS, sources.len()));

    for (s, (name, coord)) in sources.iter().zip(coordinates).enumerate() {
        let Some((i, j)) = *coord else {
            log::warn!("no model coordinates for source {name}, its pdf is zero");
            continue;
        };
        let distribution = Array1::from_shape_fn(N_TIME_BINS, |t| model.value(t, i, j));
        values
            .index_axis_mut(Axis(1), s)
            .assign(&normalise_1d(distribution.view()));
    }

    PdfTable {
        sources,
        time_bins: time_bins().to_vec(),
        values,
    }
}

/// Multiply the source distributions together and normalise.
///
/// Sources named in `not_you` are left out; if any of those names is
/// unknown the exclusion is ignored and everything is combined. In
/// `smart` mode sources whose pdf sums to zero (no model match) are skipped.
pub fn multiply_pdfs(pdfs: &PdfTable, not_you: &[String], smart: bool) -> Array1<f64> {
    let unknown: Vec<&String> = not_you
        .iter()
        .filter(|n| !pdfs.sources.contains(*n))
        .collect();
    let exclude: &[String] = if unknown.is_empty() {
        not_you
    } else {
        log::warn!("could not exclude {unknown:?}, all pdfs will be combined");
        &[]
    };

    let mut combined = Array1::<f64>::ones(pdfs.values.nrows());
    for (s, name) in pdfs.sources.iter().enumerate() {
        if exclude.contains(name) {
            continue;
        }
        let column = pdfs.values.index_axis(Axis(1), s);
        if smart && round2(column.sum()) == 0.0 {
            continue;
        }
        combined *= &column;
    }
    normalise_1d(combined.view())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// AgeWizard
// ---------------------------------------------------------------------------

/// Age fitting of a set of observed sources against one model.
#[derive(Debug, Clone)]
pub struct AgeWizard {
    pub observations: ObservationTable,
    pub coordinates: Vec<Option<(usize, usize)>>,
    pub pdfs: PdfTable,
    pub multiplied_pdf: Option<Array1<f64>>,
}

impl AgeWizard {
    pub fn new(observations: ObservationTable, model: &dyn AgeModel) -> Result<Self> {
        let coordinates = find_coordinates(&observations, model)?;
        let pdfs = pdfs_from_coordinates(observations.source_names(), &coordinates, model);
        Ok(Self {
            observations,
            coordinates,
            pdfs,
            multiplied_pdf: None,
        })
    }

    /// Build from files: observations table plus a model path (see [`load_model`]).
    pub fn from_files(observations: &Path, model: &Path) -> anyhow::Result<Self> {
        let obs = crate::data::observations::load_observations(observations)?;
        let model = load_model(model)?;
        Ok(Self::new(obs, model.as_ref())?)
    }

    pub fn sources(&self) -> &[String] {
        &self.pdfs.sources
    }

    /// Combine the source pdfs, storing the result in `multiplied_pdf`.
    pub fn multiply_pdfs(&mut self, not_you: &[String], smart: bool) -> &Array1<f64> {
        self.multiplied_pdf
            .insert(multiply_pdfs(&self.pdfs, not_you, smart))
    }

    /// Time bins where the combined pdf peaks (ties give several ages).
    pub fn most_likely_age(&mut self) -> Vec<f64> {
        if self.multiplied_pdf.is_none() {
            log::warn!("multiplied_pdf is not yet defined, combining all pdfs");
            self.multiply_pdfs(&[], true);
        }
        let Some(pdf) = &self.multiplied_pdf else {
            return Vec::new();
        };
        let max = pdf.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let bins = time_bins();
        pdf.iter()
            .enumerate()
            .filter(|(_, &v)| v == max)
            .map(|(t, _)| bins[t])
            .collect()
    }

    /// Most likely age of each source (first maximum of its pdf).
    pub fn most_likely_ages(&self) -> Vec<f64> {
        let bins = time_bins();
        self.pdfs
            .values
            .axis_iter(Axis(1))
            .map(|col| {
                let mut best = 0;
                for (t, &v) in col.iter().enumerate() {
                    if v > col[best] {
                        best = t;
                    }
                }
                bins[best]
            })
            .collect()
    }

    /// Probability that each source has a log(age) within `[min, max]`.
    pub fn calculate_p_given_age_range(&self, age_range: (f64, f64)) -> Vec<f64> {
        let lo = age_range.0.min(age_range.1);
        let hi = age_range.0.max(age_range.1);
        let in_range: Vec<bool> = self
            .pdfs
            .time_bins
            .iter()
            .map(|&t| round2(t) >= lo && round2(t) <= hi)
            .collect();

        self.pdfs
            .values
            .axis_iter(Axis(1))
            .map(|col| {
                col.iter()
                    .zip(&in_range)
                    .filter(|(_, &keep)| keep)
                    .map(|(&v, _)| v)
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HR_BINS;
    use crate::data::model::MetadataValue;
    use ndarray::Array3;
    use std::collections::BTreeMap;

    /// Counts at (logT=4.0, logL=5.0) peak at bin 10, at (3.6, 4.0) at bin 20.
    fn toy_hrd() -> HrDiagram {
        let mut high = Array3::<f64>::zeros((N_TIME_BINS, HR_BINS, HR_BINS));
        high[[10, 39, 79]] = 1.0;
        high[[11, 39, 79]] = 1e-9;
        high[[20, 35, 69]] = 1.0;
        let zeros = Array3::<f64>::zeros((N_TIME_BINS, HR_BINS, HR_BINS));
        HrDiagram::new(high, zeros.clone(), zeros, HrType::TL).unwrap()
    }

    fn obs(rows: &[(&str, MetadataValue, MetadataValue)]) -> ObservationTable {
        let rows = rows
            .iter()
            .map(|(n, t, l)| {
                BTreeMap::from([
                    ("name".to_string(), MetadataValue::String(n.to_string())),
                    ("logT".to_string(), t.clone()),
                    ("logL".to_string(), l.clone()),
                ])
            })
            .collect();
        ObservationTable::from_rows(vec!["name".into(), "logT".into(), "logL".into()], rows)
    }

    fn f(v: f64) -> MetadataValue {
        MetadataValue::Float(v)
    }

    #[test]
    fn coordinates_are_nearest_bins() {
        let hrd = toy_hrd();
        let table = obs(&[
            ("a", f(4.01), f(5.04)),
            ("b", MetadataValue::String("warm".into()), f(5.0)),
            ("c", f(4.0), f(f64::NAN)),
        ]);
        let coords = find_coordinates(&table, &hrd).unwrap();
        assert_eq!(coords, vec![Some((39, 79)), None, None]);
    }

    #[test]
    fn missing_columns_are_a_format_error() {
        let hrd = toy_hrd();
        let table = ObservationTable::from_rows(vec!["col".into(), "mag".into()], Vec::new());
        assert!(matches!(
            find_coordinates(&table, &hrd),
            Err(HokiError::Format(_))
        ));
    }

    #[test]
    fn normalise_handles_zero_sum() {
        let v = Array1::from(vec![1.0, 3.0]);
        assert_eq!(normalise_1d(v.view()).to_vec(), vec![0.25, 0.75]);
        let z = Array1::<f64>::zeros(3);
        assert_eq!(normalise_1d(z.view()).to_vec(), vec![0.0; 3]);
    }

    #[test]
    fn pdfs_are_normalised_per_source() {
        let hrd = toy_hrd();
        let table = obs(&[("a", f(4.0), f(5.0)), ("b", f(3.6), f(4.0)), ("c", f(8.0), f(-2.0))]);
        let pdfs = calculate_pdfs(&table, &hrd).unwrap();
        assert_eq!(pdfs.sources, vec!["a", "b", "c"]);
        assert!((pdfs.column("a").unwrap().sum() - 1.0).abs() < 1e-12);
        assert!((pdfs.column("b").unwrap()[20] - 1.0).abs() < 1e-12);
        assert_eq!(pdfs.column("c").unwrap().sum(), 0.0);
    }

    #[test]
    fn smart_multiplication_skips_empty_sources() {
        let hrd = toy_hrd();
        let table = obs(&[("a", f(4.0), f(5.0)), ("c", f(8.0), f(-2.0))]);
        let pdfs = calculate_pdfs(&table, &hrd).unwrap();

        let smart = multiply_pdfs(&pdfs, &[], true);
        assert!((smart.sum() - 1.0).abs() < 1e-12);
        assert!(smart[10] > 0.99);

        let naive = multiply_pdfs(&pdfs, &[], false);
        assert_eq!(naive.sum(), 0.0);
    }

    #[test]
    fn unknown_exclusions_combine_everything() {
        let hrd = toy_hrd();
        let table = obs(&[("a", f(4.0), f(5.0)), ("b", f(3.6), f(4.0))]);
        let pdfs = calculate_pdfs(&table, &hrd).unwrap();

        let only_b = multiply_pdfs(&pdfs, &["a".to_string()], true);
        assert!((only_b[20] - 1.0).abs() < 1e-12);

        // a and b never overlap, so the full product is zero everywhere
        let all = multiply_pdfs(&pdfs, &["zz".to_string()], true);
        assert_eq!(all.sum(), 0.0);
    }

    #[test]
    fn wizard_reports_ages() {
        let hrd = toy_hrd();
        let table = obs(&[("a", f(4.0), f(5.0)), ("b", f(3.6), f(4.0))]);
        let mut wizard = AgeWizard::new(table, &hrd).unwrap();

        assert_eq!(wizard.most_likely_ages(), vec![7.0, 8.0]);

        wizard.multiply_pdfs(&["b".to_string()], true);
        assert_eq!(wizard.most_likely_age(), vec![7.0]);

        let p = wizard.calculate_p_given_age_range((6.9, 7.0));
        assert!((p[0] - 1.0).abs() < 1e-6);
        assert_eq!(p[1], 0.0);
    }

    #[test]
    fn most_likely_age_combines_on_demand() {
        let hrd = toy_hrd();
        let table = obs(&[("a", f(4.0), f(5.0))]);
        let mut wizard = AgeWizard::new(table, &hrd).unwrap();
        assert!(wizard.multiplied_pdf.is_none());
        assert_eq!(wizard.most_likely_age(), vec![7.0]);
        assert!(wizard.multiplied_pdf.is_some());
    }

    #[test]
    fn tied_peaks_give_every_age() {
        let mut cmd = Cmd::new([0.0, 1.0], [-1.0, 1.0], 0.5);
        cmd.grid[[5, 3, 1]] = 1.0;
        cmd.grid[[8, 3, 1]] = 1.0;
        let table = ObservationTable::from_rows(
            vec!["col".into(), "mag".into()],
            vec![BTreeMap::from([
                ("col".to_string(), f(0.5)),
                ("mag".to_string(), f(0.5)),
            ])],
        );
        let mut wizard = AgeWizard::new(table, &cmd).unwrap();
        assert_eq!(wizard.most_likely_age(), vec![6.5, 6.8]);
        assert_eq!(wizard.most_likely_ages(), vec![6.5]);
    }

    #[test]
    fn cmd_coordinates_use_mag_then_colour() {
        let mut cmd = Cmd::new([0.0, 1.0], [-1.0, 1.0], 0.5);
        cmd.grid[[5, 3, 1]] = 2.0;
        let table = ObservationTable::from_rows(
            vec!["col".into(), "mag".into()],
            vec![BTreeMap::from([
                ("col".to_string(), f(0.5)),
                ("mag".to_string(), f(0.5)),
            ])],
        );
        let pdfs = calculate_pdfs(&table, &cmd).unwrap();
        assert_eq!(pdfs.sources, vec!["s0"]);
        assert!((pdfs.values[[5, 0]] - 1.0).abs() < 1e-12);
    }
}
