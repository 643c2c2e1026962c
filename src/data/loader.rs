use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Array3};

use super::model::{ModelInput, ModelOutput, OutputKind, OutputTable, Spectra};
use crate::constants::{
    COLOURS_COLUMNS, HR_BINS, IONIZING_COLUMNS, NUMBERS_COLUMNS, N_TIME_BINS, STARMASS_COLUMNS,
    SUPERNOVA_COLUMNS, YIELDS_COLUMNS,
};
use crate::hrdiagrams::{HrDiagram, HrType};

/// Rows per abundance block of an HR-diagram file (51 ages x 100 rows).
const HRD_BLOCK_ROWS: usize = N_TIME_BINS * HR_BINS;

/// Rows in a complete HR-diagram file: 3 diagram types x 3 abundances.
pub const HRD_FILE_ROWS: usize = 9 * HRD_BLOCK_ROWS;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a BPASS output file. Dispatch by file name.
///
/// Recognised names contain one of `hrs`, `spectra`, `ionizing`,
/// `numbers`, `yields`, `supernova`, `starmass` or `colours`, as BPASS
/// writes them (e.g. `hrs-bin-imf135_300.z020.dat`). HR-diagram files hold
/// three diagram types, so `hr_type` must name the one to load.
pub fn model_output(path: &Path, hr_type: Option<HrType>) -> Result<ModelOutput> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();

    if name.contains("hrs") {
        let hr_type = hr_type.context("HR diagram files need an hr_type (TL, Tg or TTG)")?;
        return Ok(ModelOutput::HrDiagram(Box::new(hr_diagram(path, hr_type)?)));
    }
    if name.contains("spectra") {
        return Ok(ModelOutput::Spectra(spectra(path)?));
    }

    let kind = [
        OutputKind::Ionizing,
        OutputKind::Numbers,
        OutputKind::Yields,
        OutputKind::Supernova,
        OutputKind::StarMass,
        OutputKind::Colours,
    ]
    .into_iter()
    .find(|k| name.contains(k.prefix()));

    match kind {
        Some(kind) => Ok(ModelOutput::Table(output_table(path, kind)?)),
        None => bail!("Unrecognised BPASS output file: {name}"),
    }
}

// ---------------------------------------------------------------------------
// HR diagrams
// ---------------------------------------------------------------------------

/// Load one diagram type from an HR-diagram file.
///
/// The file has 45 900 rows of 100 columns: nine blocks of 5100 rows,
/// ordered TL, Tg, TTG and within each type high, medium, low hydrogen
/// abundance. Each block is a plain reshape to `[51, 100, 100]`: row
/// `t * 100 + i` column `j` is the count at time bin `t`, temperature bin
/// `i` and second-axis bin `j`.
pub fn hr_diagram(path: &Path, hr_type: HrType) -> Result<HrDiagram> {
    let rows = read_numeric_rows(path)?;
    if rows.len() != HRD_FILE_ROWS {
        bail!(
            "{}: expected {HRD_FILE_ROWS} rows in an HR diagram file, found {}",
            path.display(),
            rows.len()
        );
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != HR_BINS) {
        bail!("{} row {i}: expected {HR_BINS} columns, found {}", path.display(), row.len());
    }

    let type_offset = match hr_type {
        HrType::TL => 0,
        HrType::Tg => 3,
        HrType::TTG => 6,
    };
    let block = |abundance: usize| -> Array3<f64> {
        let start = (type_offset + abundance) * HRD_BLOCK_ROWS;
        Array3::from_shape_fn((N_TIME_BINS, HR_BINS, HR_BINS), |(t, i, j)| {
            rows[start + t * HR_BINS + i][j]
        })
    };

    let hrd = HrDiagram::new(block(0), block(1), block(2), hr_type)?;
    log::info!("Loaded {hr_type} HR diagram from {}", path.display());
    Ok(hrd)
}

// ---------------------------------------------------------------------------
// Spectra and tables
// ---------------------------------------------------------------------------

/// Load a spectra file: wavelength followed by one column per time bin.
pub fn spectra(path: &Path) -> Result<Spectra> {
    let rows = read_numeric_rows(path)?;
    let width = N_TIME_BINS + 1;
    if rows.is_empty() {
        bail!("{}: spectra file is empty", path.display());
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        bail!("{} row {i}: expected {width} columns, found {}", path.display(), row.len());
    }

    let wavelength = Array1::from_iter(rows.iter().map(|r| r[0]));
    let luminosity =
        Array2::from_shape_fn((rows.len(), N_TIME_BINS), |(w, t)| rows[w][t + 1]);
    log::info!("Loaded {} spectral points from {}", rows.len(), path.display());
    Ok(Spectra {
        wavelength,
        luminosity,
    })
}

/// Load a tabulated output with the column layout of `kind`.
pub fn output_table(path: &Path, kind: OutputKind) -> Result<OutputTable> {
    let columns: &[&str] = match kind {
        OutputKind::Ionizing => IONIZING_COLUMNS,
        OutputKind::Numbers => NUMBERS_COLUMNS,
        OutputKind::Yields => YIELDS_COLUMNS,
        OutputKind::Supernova => SUPERNOVA_COLUMNS,
        OutputKind::StarMass => STARMASS_COLUMNS,
        OutputKind::Colours => COLOURS_COLUMNS,
    };

    let rows = read_numeric_rows(path)?;
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
        bail!(
            "{} row {i}: expected {} columns for a {} file, found {}",
            path.display(),
            columns.len(),
            kind.prefix(),
            row.len()
        );
    }

    let data = Array2::from_shape_fn((rows.len(), columns.len()), |(r, c)| rows[r][c]);
    Ok(OutputTable {
        kind,
        columns: columns.iter().map(|c| c.to_string()).collect(),
        data,
    })
}

// ---------------------------------------------------------------------------
// Model inputs and stellar models
// ---------------------------------------------------------------------------

/// Load a BPASS model input listing.
///
/// Each row: `filename model_imf type mixed_imf mixed_age initial_BH initial_P`.
/// A leading model-count line, blank lines and `#` comments are skipped.
/// Trailing columns missing from a row are NaN.
pub fn model_input(path: &Path) -> Result<Vec<ModelInput>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut inputs = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {} line {line_no}", path.display()))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() || tokens[0].starts_with('#') {
            continue;
        }
        if tokens.len() == 1 && tokens[0].parse::<usize>().is_ok() {
            continue;
        }
        if tokens.len() < 3 {
            bail!(
                "{} line {line_no}: expected at least filename, model_imf and type",
                path.display()
            );
        }

        let num = |i: usize| -> Result<f64> {
            match tokens.get(i) {
                Some(tok) => parse_float(tok)
                    .with_context(|| format!("{} line {line_no}: '{tok}'", path.display())),
                None => Ok(f64::NAN),
            }
        };

        inputs.push(ModelInput {
            filename: tokens[0].to_string(),
            model_imf: num(1)?,
            model_type: num(2)? as i64,
            mixed_imf: num(3)?,
            mixed_age: num(4)?,
            initial_bh: num(5)?,
            initial_p: num(6)?,
        });
    }

    log::info!("Read {} model inputs from {}", inputs.len(), path.display());
    Ok(inputs)
}

/// Read selected columns of a stellar-model file, one array per row.
pub fn stellar_model<const N: usize>(path: &Path, columns: &[usize; N]) -> Result<Vec<[f64; N]>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {} line {line_no}", path.display()))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let mut row = [0.0; N];
        for (slot, &col) in row.iter_mut().zip(columns) {
            let tok = tokens.get(col).with_context(|| {
                format!("{} line {line_no}: no column {col}", path.display())
            })?;
            *slot = parse_float(tok)
                .with_context(|| format!("{} line {line_no}: '{tok}'", path.display()))?;
        }
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Whitespace-separated numeric files
// ---------------------------------------------------------------------------

/// Read every non-empty line of a whitespace-separated numeric file.
fn read_numeric_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {} line {line_no}", path.display()))?;
        let row = line
            .split_whitespace()
            .map(|tok| {
                parse_float(tok)
                    .with_context(|| format!("{} line {line_no}: '{tok}'", path.display()))
            })
            .collect::<Result<Vec<f64>>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Parse a float, accepting Fortran `D` exponents (`1.0D+05`).
fn parse_float(tok: &str) -> Result<f64> {
    if let Ok(v) = tok.parse::<f64>() {
        return Ok(v);
    }
    tok.replace(['D', 'd'], "E")
        .parse::<f64>()
        .with_context(|| format!("'{tok}' is not a number"))
}
