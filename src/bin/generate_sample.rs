//! Write a small synthetic BPASS data set for trying out the viewer:
//! an HR-diagram file, a spectra file, a model input listing with its
//! stellar models, and an observation table as CSV and Parquet.
//!
//! Usage: `generate_sample [output_dir]` (default `sample_data`).

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use hoki::constants::{stellar_column, time_bins, HR_BINS, N_TIME_BINS};

/// Columns in a BPASS stellar-model file.
const STELLAR_MODEL_WIDTH: usize = 96;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// A population whose turn-off cools and dims with age.
fn population_centre(log_age: f64) -> (f64, f64) {
    let x = (log_age - 6.0) / 5.0;
    (4.6 - 1.0 * x, 5.5 - 5.0 * x)
}

// ---------------------------------------------------------------------------
// HR diagram
// ---------------------------------------------------------------------------

fn write_hr_diagram(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let ages = time_bins();

    // TL, Tg, TTG x high, medium, low abundance
    for block in 0..9 {
        let scale = [1.0, 0.3, 0.05][block % 3];
        for &log_age in &ages {
            let (t0, l0) = population_centre(log_age);
            // one row per temperature bin, one column per second-axis bin
            for i in 0..HR_BINS {
                let log_t = 0.1 * (i + 1) as f64;
                let row: Vec<String> = (0..HR_BINS)
                    .map(|j| {
                        let second = -2.9 + 0.1 * j as f64;
                        let v = gaussian(log_t, t0, 0.15, 1e4 * scale)
                            * gaussian(second, l0, 0.4, 1.0);
                        format!("{v:.6E}")
                    })
                    .collect();
                writeln!(out, "{}", row.join(" "))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Spectra
// ---------------------------------------------------------------------------

fn write_spectra(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let ages = time_bins();

    for k in 0..1000 {
        let wavelength = 1.0 + 100.0 * k as f64;
        let mut row = vec![format!("{wavelength:.1}")];
        for &log_age in &ages {
            let (log_t, l0) = population_centre(log_age);
            // Wien peak in Angstrom
            let peak = 2.898e7 / 10f64.powf(log_t);
            let lum = 10f64.powf(l0) * gaussian(wavelength.ln(), peak.ln(), 0.8, 1.0);
            row.push(format!("{lum:.6E}"));
        }
        writeln!(out, "{}", row.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Model input and stellar models
// ---------------------------------------------------------------------------

fn write_models(dir: &Path, input_path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let models_dir = dir.join("models");
    fs::create_dir_all(&models_dir)?;

    let column = |name: &str| stellar_column(name).with_context(|| format!("no column {name}"));
    let (age_col, t_col, l_col, m_col) =
        (column("age")?, column("log(T1)")?, column("log(L1)")?, column("M1")?);
    let (b_col, v_col) = (column("B")?, column("V")?);

    let n_models = 20;
    let mut input = BufWriter::new(File::create(input_path)?);
    writeln!(input, "{n_models}")?;

    for n in 0..n_models {
        let filename = format!("sneplot-z020-{}", n + 1);
        let mass = 1.0 + 4.0 * rng.next_f64();
        writeln!(input, "{filename} {:.6E} 0 0.0 0.0 0.0 0.0", 0.01 / mass)?;

        let mut out = BufWriter::new(File::create(models_dir.join(&filename))?);
        for step in 0..50 {
            let age = 1e6 * 10f64.powf(4.0 * step as f64 / 50.0);
            let v = 4.0 - 2.5 * mass.log10() * 3.0 + 0.02 * step as f64 + rng.gauss(0.0, 0.05);
            let b_minus_v = -0.2 + 0.03 * step as f64 + rng.gauss(0.0, 0.02);

            let mut row = vec![0.0; STELLAR_MODEL_WIDTH];
            row[0] = age * 0.1;
            row[age_col] = age;
            row[t_col] = 4.3 - 0.01 * step as f64;
            row[l_col] = 3.5 * mass.log10() + 0.01 * step as f64;
            row[m_col] = mass;
            row[v_col] = v;
            row[b_col] = v + b_minus_v;
            let row: Vec<String> = row.iter().map(|x| format!("{x:.6E}")).collect();
            writeln!(out, "{}", row.join(" "))?;
        }
        out.flush()?;
    }
    input.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

fn write_observations(dir: &Path, rng: &mut SimpleRng) -> Result<()> {
    let (t0, l0) = population_centre(7.0);
    let names: Vec<String> = (1..=8).map(|i| format!("star{i}")).collect();
    let log_t: Vec<f64> = names.iter().map(|_| rng.gauss(t0, 0.05)).collect();
    let log_l: Vec<f64> = names.iter().map(|_| rng.gauss(l0, 0.2)).collect();

    let mut table = csv::Writer::from_path(dir.join("observations.csv"))?;
    table.write_record(["name", "logT", "logL"])?;
    for ((name, t), l) in names.iter().zip(&log_t).zip(&log_l) {
        table.write_record([name.clone(), format!("{t:.3}"), format!("{l:.3}")])?;
    }
    table.flush()?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("logT", DataType::Float64, false),
        Field::new("logL", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(names.clone())),
            Arc::new(Float64Array::from(log_t)),
            Arc::new(Float64Array::from(log_l)),
        ],
    )?;

    let file = File::create(dir.join("observations.parquet"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let dir = std::env::args().nth(1).unwrap_or_else(|| "sample_data".to_string());
    let dir = Path::new(&dir);
    fs::create_dir_all(dir)?;
    let mut rng = SimpleRng::new(42);

    write_hr_diagram(&dir.join("hrs-bin-imf135_300.z020.dat"))?;
    write_spectra(&dir.join("spectra-bin-imf135_300.z020.dat"))?;
    write_models(dir, &dir.join("input_bpass_z020_bin_imf135_300"), &mut rng)?;
    write_observations(dir, &mut rng)?;

    println!(
        "Wrote a {N_TIME_BINS}-bin synthetic BPASS data set to {}",
        dir.display()
    );
    Ok(())
}
