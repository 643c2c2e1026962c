use std::fs;
use std::io::Write;
use std::path::Path;

use hoki::age::AgeWizard;
use hoki::constants::{stellar_column, HR_BINS};
use hoki::data::loader::{self, HRD_FILE_ROWS};
use hoki::hrdiagrams::{Abundance, HrType};

/// HR-diagram file with `value` at (bin 10, logT 4.0, logL 5.0) in the
/// high-abundance TL block and noise in the Tg block.
fn write_hrd_file(path: &Path, value: f64) {
    let mut out = std::io::BufWriter::new(fs::File::create(path).unwrap());
    // block row t * 100 + (logT bin), column = logL bin
    let tl_row = 10 * HR_BINS + 39;
    let tg_block_start = 3 * HRD_FILE_ROWS / 9;
    for r in 0..HRD_FILE_ROWS {
        let row: Vec<String> = (0..HR_BINS)
            .map(|col| {
                if (r == tl_row && col == 79) || (r == tg_block_start + 5 && col == 2) {
                    format!("{value:E}")
                } else {
                    "0".to_string()
                }
            })
            .collect();
        writeln!(out, "{}", row.join(" ")).unwrap();
    }
}

#[test]
fn hr_diagram_file_fits_observed_sources() {
    let dir = tempfile::tempdir().unwrap();
    let hrd_path = dir.path().join("hrs-bin-imf135_300.z020.dat");
    write_hrd_file(&hrd_path, 5.0);

    let hrd = loader::hr_diagram(&hrd_path, HrType::TL).unwrap();
    let unweighted = hrd.unweighted(Abundance::High);
    assert!((unweighted[[10, 39, 79]] - 5.0).abs() < 1e-9);
    assert_eq!(unweighted.sum(), unweighted[[10, 39, 79]]);
    // rows are temperature bins, columns the second axis
    assert_eq!(unweighted[[10, 79, 39]], 0.0);

    let obs_path = dir.path().join("stars.csv");
    fs::write(&obs_path, "name,logT,logL\na,4.0,5.0\nb,4.02,4.98\n").unwrap();

    let mut wizard = AgeWizard::from_files(&obs_path, &hrd_path).unwrap();
    assert_eq!(wizard.sources(), &["a".to_string(), "b".to_string()]);
    assert_eq!(wizard.coordinates, vec![Some((39, 79)), Some((39, 79))]);
    assert_eq!(wizard.most_likely_ages(), vec![7.0, 7.0]);
    assert_eq!(wizard.most_likely_age(), vec![7.0]);

    let p = wizard.calculate_p_given_age_range((6.9, 7.1));
    assert!(p.iter().all(|&v| (v - 1.0).abs() < 1e-9));
}

#[test]
fn saved_cmd_fits_observed_sources() {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models");
    fs::create_dir(&models).unwrap();

    let mut row = vec!["0".to_string(); 96];
    row[0] = "1.0".to_string();
    row[stellar_column("age").unwrap()] = "1.0E7".to_string();
    row[stellar_column("V").unwrap()] = "0.0".to_string();
    row[stellar_column("B").unwrap()] = "0.5".to_string();
    fs::write(models.join("model-1"), row.join(" ") + "\n").unwrap();

    let input = dir.path().join("input_bpass_z020");
    fs::write(&input, "2\nmodel-1 1.0 0\nmissing-model 1.0 0\n").unwrap();

    let inputs = loader::model_input(&input).unwrap();
    let mut cmd = hoki::config::Settings::default().empty_cmd();
    cmd.make(&inputs, &models, "V", ("B", "V")).unwrap();
    assert_eq!(cmd.missing_files, vec!["missing-model".to_string()]);

    let cmd_path = dir.path().join("cmd.json");
    cmd.save(&cmd_path).unwrap();

    let obs_path = dir.path().join("stars.csv");
    fs::write(&obs_path, "name,mag,col\nx,0.0,0.5\ny,,0.5\n").unwrap();

    let wizard = AgeWizard::from_files(&obs_path, &cmd_path).unwrap();
    assert!(wizard.coordinates[0].is_some());
    assert!(wizard.coordinates[1].is_none());
    assert_eq!(wizard.most_likely_ages()[0], 7.0);
    assert_eq!(wizard.pdfs.values.column(1).sum(), 0.0);
}
