//! Colour-magnitude diagrams built from the BPASS stellar models.
//!
//! Every stellar-model file listed in the model input is read, each row's
//! colour and magnitude are located on a fixed grid, and the cell for the
//! row's age bin is incremented by the IMF weight times the row's timestep.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::constants::{stellar_column, time_bin_index, N_TIME_BINS, LOG_AGE_MIN};
use crate::data::loader::stellar_model;
use crate::data::model::ModelInput;
use crate::error::{HokiError, Result};
use crate::grid::{nearest_index_within, regular_axis, AgeGrid};

const TIMESTEP_COLUMN: usize = 0;
const AGE_COLUMN: usize = 1;

/// Filters used to build a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdFilters {
    pub mag: String,
    pub col: (String, String),
}

impl CmdFilters {
    pub fn colour_label(&self) -> String {
        format!("{}-{}", self.col.0, self.col.1)
    }
}

/// A stack of colour-magnitude histograms indexed `[time_bin, mag_bin, col_bin]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cmd {
    pub col_range: Vec<f64>,
    pub mag_range: Vec<f64>,
    pub grid: AgeGrid,
    pub filters: Option<CmdFilters>,
    /// Model files that could not be read during [`Cmd::make`].
    pub missing_files: Vec<String>,
    /// Rows dropped for NaN photometry or falling off the grid.
    pub skipped_rows: usize,
}

impl Default for Cmd {
    fn default() -> Self {
        Self::new([-3.0, 7.0], [-14.0, 10.0], 0.1)
    }
}

impl Cmd {
    /// Empty diagram spanning `col_lim` x `mag_lim` with bins of `res_el`.
    pub fn new(col_lim: [f64; 2], mag_lim: [f64; 2], res_el: f64) -> Self {
        let col_range = regular_axis(col_lim[0], col_lim[1], res_el);
        let mag_range = regular_axis(mag_lim[0], mag_lim[1], res_el);
        let grid = Array3::zeros((N_TIME_BINS, mag_range.len(), col_range.len()));
        Self {
            col_range,
            mag_range,
            grid,
            filters: None,
            missing_files: Vec::new(),
            skipped_rows: 0,
        }
    }

    /// Histogram every stellar model listed in `inputs`.
    ///
    /// `models_dir` is the directory holding the BPASS stellar-model files.
    /// Unreadable files are recorded in [`Cmd::missing_files`] and skipped.
    pub fn make(
        &mut self,
        inputs: &[ModelInput],
        models_dir: &Path,
        mag_filter: &str,
        col_filters: (&str, &str),
    ) -> Result<()> {
        let lookup = |name: &str| {
            stellar_column(name)
                .ok_or_else(|| HokiError::Format(format!("unknown filter '{name}'")))
        };
        let mag_idx = lookup(mag_filter)?;
        let col1_idx = lookup(col_filters.0)?;
        let col2_idx = lookup(col_filters.1)?;
        let columns = [TIMESTEP_COLUMN, AGE_COLUMN, mag_idx, col1_idx, col2_idx];

        log::info!(
            "building {}-{} vs {} CMD from {} models",
            col_filters.0,
            col_filters.1,
            mag_filter,
            inputs.len()
        );

        for (n, input) in inputs.iter().enumerate() {
            let path = models_dir.join(&input.filename);
            let rows = match stellar_model(&path, &columns) {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("skipping model {}: {e:#}", input.filename);
                    self.missing_files.push(input.filename.clone());
                    continue;
                }
            };

            for [timestep, age, mag, c1, c2] in rows {
                if !self.add_row(input.model_imf * timestep, age, mag, c1 - c2) {
                    self.skipped_rows += 1;
                }
            }

            if (n + 1) % 1000 == 0 {
                log::info!("processed {}/{} models", n + 1, inputs.len());
            }
        }

        if !self.missing_files.is_empty() {
            log::warn!("{} model files could not be read", self.missing_files.len());
        }

        self.filters = Some(CmdFilters {
            mag: mag_filter.to_string(),
            col: (col_filters.0.to_string(), col_filters.1.to_string()),
        });
        Ok(())
    }

    /// Add `weight` at (age, mag, colour). Returns false if the row was dropped.
    fn add_row(&mut self, weight: f64, age: f64, mag: f64, colour: f64) -> bool {
        if age.is_nan() || weight.is_nan() {
            return false;
        }
        let log_age = if age > 0.0 { age.log10().max(LOG_AGE_MIN) } else { LOG_AGE_MIN };
        let Some(mag_i) = nearest_index_within(&self.mag_range, mag) else {
            return false;
        };
        let Some(col_i) = nearest_index_within(&self.col_range, colour) else {
            return false;
        };
        self.grid[[time_bin_index(log_age), mag_i, col_i]] += weight;
        true
    }

    /// Diagram in the time bin containing `log_age`.
    pub fn at_log_age(&self, log_age: f64) -> ArrayView2<'_, f64> {
        self.grid.index_axis(Axis(0), time_bin_index(log_age))
    }

    /// Diagram at a time bin.
    pub fn at_bin(&self, bin: usize) -> ArrayView2<'_, f64> {
        self.grid.index_axis(Axis(0), bin)
    }

    /// Write the diagram as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        log::info!("saved CMD to {}", path.display());
        Ok(())
    }

    /// Read a diagram written by [`Cmd::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let cmd: Cmd = serde_json::from_reader(reader)?;
        let expected = [N_TIME_BINS, cmd.mag_range.len(), cmd.col_range.len()];
        if cmd.grid.shape() != expected {
            return Err(HokiError::Format(format!(
                "CMD grid has shape {:?}, expected {expected:?}",
                cmd.grid.shape()
            )));
        }
        Ok(cmd)
    }
}

impl Index<[usize; 3]> for Cmd {
    type Output = f64;

    fn index(&self, idx: [usize; 3]) -> &f64 {
        &self.grid[idx]
    }
}
