use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::hrdiagrams::HrDiagram;

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in an observation table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell mirroring common Pandas dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Interpret the value as an `f64`. Numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ObservationTable – the observed sources to be dated
// ---------------------------------------------------------------------------

static NULL_CELL: MetadataValue = MetadataValue::Null;

/// Observed sources, one row per source, columns by name.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    /// Column names in file order.
    pub column_names: Vec<String>,
    pub rows: Vec<BTreeMap<String, MetadataValue>>,
}

impl ObservationTable {
    pub fn from_rows(column_names: Vec<String>, rows: Vec<BTreeMap<String, MetadataValue>>) -> Self {
        Self { column_names, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Cell at (row, column), `Null` when absent.
    pub fn value(&self, row: usize, column: &str) -> &MetadataValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_CELL)
    }

    /// Source names from the `name` column, or `s0, s1, ...` if it is missing.
    pub fn source_names(&self) -> Vec<String> {
        if !self.has_column("name") {
            log::warn!("no 'name' column in the observations, generating source names");
            return (0..self.len()).map(|i| format!("s{i}")).collect();
        }
        (0..self.len())
            .map(|i| match self.value(i, "name") {
                MetadataValue::Null => format!("s{i}"),
                v => v.to_string(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// BPASS inputs and outputs
// ---------------------------------------------------------------------------

/// One row of a BPASS model input file: a stellar-model file and its weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub filename: String,
    pub model_imf: f64,
    pub model_type: i64,
    pub mixed_imf: f64,
    pub mixed_age: f64,
    pub initial_bh: f64,
    pub initial_p: f64,
}

/// Spectral energy distributions at every age bin.
#[derive(Debug, Clone)]
pub struct Spectra {
    /// Wavelength in Angstrom.
    pub wavelength: Array1<f64>,
    /// Luminosity per wavelength, shaped `[n_wavelengths, 51]`.
    pub luminosity: Array2<f64>,
}

impl Spectra {
    /// The spectrum at one time bin.
    pub fn at_bin(&self, bin: usize) -> ArrayView1<'_, f64> {
        self.luminosity.index_axis(Axis(1), bin)
    }
}

/// Which tabulated BPASS output a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Ionizing,
    Numbers,
    Yields,
    Supernova,
    StarMass,
    Colours,
}

impl OutputKind {
    /// File-name prefix used by BPASS.
    pub fn prefix(self) -> &'static str {
        match self {
            OutputKind::Ionizing => "ionizing",
            OutputKind::Numbers => "numbers",
            OutputKind::Yields => "yields",
            OutputKind::Supernova => "supernova",
            OutputKind::StarMass => "starmass",
            OutputKind::Colours => "colours",
        }
    }
}

/// A tabulated output: one row per time bin, named columns.
#[derive(Debug, Clone)]
pub struct OutputTable {
    pub kind: OutputKind,
    pub columns: Vec<String>,
    pub data: Array2<f64>,
}

impl OutputTable {
    /// A column by name.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.data.index_axis(Axis(1), idx))
    }
}

/// Anything [`crate::data::loader::model_output`] can return.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    HrDiagram(Box<HrDiagram>),
    Spectra(Spectra),
    Table(OutputTable),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, MetadataValue)]) -> BTreeMap<String, MetadataValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn numeric_strings_are_numbers() {
        assert_eq!(MetadataValue::String(" 4.5".into()).as_f64(), Some(4.5));
        assert_eq!(MetadataValue::String("hot".into()).as_f64(), None);
        assert_eq!(MetadataValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(MetadataValue::Null.as_f64(), None);
    }

    #[test]
    fn names_are_generated_without_name_column() {
        let table = ObservationTable::from_rows(
            vec!["logT".into()],
            vec![
                row(&[("logT", MetadataValue::Float(4.0))]),
                row(&[("logT", MetadataValue::Float(3.6))]),
            ],
        );
        assert_eq!(table.source_names(), vec!["s0", "s1"]);
    }

    #[test]
    fn names_come_from_name_column() {
        let table = ObservationTable::from_rows(
            vec!["name".into()],
            vec![row(&[("name", MetadataValue::String("118-1".into()))])],
        );
        assert_eq!(table.source_names(), vec!["118-1"]);
        assert_eq!(table.value(0, "logL"), &MetadataValue::Null);
    }

    #[test]
    fn numeric_names_keep_their_digits() {
        let table = ObservationTable::from_rows(
            vec!["name".into()],
            vec![
                row(&[("name", MetadataValue::Float(4.25))]),
                row(&[("name", MetadataValue::Float(118.123456))]),
                row(&[("name", MetadataValue::Integer(7))]),
            ],
        );
        assert_eq!(table.source_names(), vec!["4.25", "118.123456", "7"]);
    }

    #[test]
    fn table_columns_by_name() {
        let table = OutputTable {
            kind: OutputKind::StarMass,
            columns: vec!["log_age".into(), "stellar_mass".into()],
            data: ndarray::array![[6.0, 1.0], [6.1, 2.0]],
        };
        assert_eq!(table.column("stellar_mass").unwrap().to_vec(), vec![1.0, 2.0]);
        assert!(table.column("remnant_mass").is_none());
        assert_eq!(table.kind.prefix(), "starmass");
    }
}
