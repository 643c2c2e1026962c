//! BPASS grid constants: the age axis, HR-diagram axes and the column
//! layouts of the model files.

/// Number of log(age) bins in every BPASS output (6.0 to 11.0, step 0.1).
pub const N_TIME_BINS: usize = 51;

/// Number of bins along each HR-diagram axis.
pub const HR_BINS: usize = 100;

/// Width of a log(age) bin and of every HR-diagram bin.
pub const BIN_WIDTH: f64 = 0.1;

/// Smallest log(age) in the BPASS grid.
pub const LOG_AGE_MIN: f64 = 6.0;

/// Upper edge of the last log(age) bin.
pub const LOG_AGE_MAX: f64 = 11.1;

/// log(age/yr) bin centres.
pub fn time_bins() -> [f64; N_TIME_BINS] {
    // Integer tenths keep the centres exact (6.1, not 6.1000000000000005).
    std::array::from_fn(|i| (60 + i) as f64 / 10.0)
}

/// Number of years covered by each log(age) bin.
pub fn time_intervals() -> [f64; N_TIME_BINS] {
    let bins = time_bins();
    std::array::from_fn(|i| 10f64.powf(bins[i] + 0.05) - 10f64.powf(bins[i] - 0.05))
}

/// Index of the time bin containing `log_age`, clamped to the grid.
pub fn time_bin_index(log_age: f64) -> usize {
    let raw = (10.0 * (log_age - LOG_AGE_MIN)).round();
    if raw.is_nan() || raw < 0.0 {
        0
    } else {
        (raw as usize).min(N_TIME_BINS - 1)
    }
}

fn hr_axis(start_tenths: i32) -> [f64; HR_BINS] {
    std::array::from_fn(|i| (start_tenths + i as i32) as f64 / 10.0)
}

/// log(T/K) axis of the HR diagrams: 0.1 ..= 10.0.
pub fn log_t_bins() -> [f64; HR_BINS] {
    hr_axis(1)
}

/// log(L/Lsun) axis: -2.9 ..= 7.0. Also used for log(g) and log(T^4/g).
pub fn log_l_bins() -> [f64; HR_BINS] {
    hr_axis(-29)
}

pub fn log_g_bins() -> [f64; HR_BINS] {
    hr_axis(-29)
}

pub fn log_tg_bins() -> [f64; HR_BINS] {
    hr_axis(-29)
}

// ---------------------------------------------------------------------------
// Stellar-model files
// ---------------------------------------------------------------------------

/// Column index of each quantity in a BPASS stellar-model file.
pub const STELLAR_MODEL_COLUMNS: &[(&str, usize)] = &[
    ("timestep", 0),
    ("age", 1),
    ("log(R1)", 2),
    ("log(T1)", 3),
    ("log(L1)", 4),
    ("M1", 5),
    ("He_core1", 6),
    ("CO_core1", 7),
    ("ONe_core1", 8),
    ("X", 10),
    ("Y", 11),
    ("C", 12),
    ("N", 13),
    ("O", 14),
    ("Ne", 15),
    ("MH1", 16),
    ("MHe1", 17),
    ("MC1", 18),
    ("MN1", 19),
    ("MO1", 20),
    ("MNe1", 21),
    ("MMg1", 22),
    ("MSi1", 23),
    ("MFe1", 24),
    ("envelope_binding_E", 25),
    ("star_binding_E", 26),
    ("Mrem_weakSN", 27),
    ("Mej_weakSN", 28),
    ("Mrem_SN", 29),
    ("Mej_SN", 30),
    ("Mrem_superSN", 31),
    ("Mej_superSN", 32),
    ("AM_bin", 33),
    ("P_bin", 34),
    ("log(a)", 35),
    ("M2", 37),
    ("MTOT", 38),
    ("DM1W", 39),
    ("DM2W", 40),
    ("DM1A", 41),
    ("DM2A", 42),
    ("DM1R", 43),
    ("DM2R", 44),
    ("DAM", 45),
    ("log(R2)", 46),
    ("log(T2)", 47),
    ("log(L2)", 48),
    ("?", 49),
    ("modelimf", 50),
    ("mixedimf", 51),
    ("V-I", 52),
    ("U", 53),
    ("B", 54),
    ("V", 55),
    ("R", 56),
    ("I", 57),
    ("J", 58),
    ("H", 59),
    ("K", 60),
    ("u", 61),
    ("g", 62),
    ("r", 63),
    ("i", 64),
    ("z", 65),
    ("f300w", 66),
    ("f336w", 67),
    ("f435w", 68),
    ("f450w", 69),
    ("f555w", 70),
    ("f606w", 71),
    ("f814w", 72),
    ("U2", 73),
    ("B2", 74),
    ("V2", 75),
    ("R2", 76),
    ("I2", 77),
    ("J2", 78),
    ("H2", 79),
    ("K2", 80),
    ("u2", 81),
    ("g2", 82),
    ("r2", 83),
    ("i2", 84),
    ("z2", 85),
    ("f300w2", 86),
    ("f336w2", 87),
    ("f435w2", 88),
    ("f450w2", 89),
    ("f555w2", 90),
    ("f606w2", 91),
    ("f814w2", 92),
    ("Halpha", 93),
    ("FUV", 94),
    ("NUV", 95),
];

/// Look up a stellar-model column by name.
pub fn stellar_column(name: &str) -> Option<usize> {
    STELLAR_MODEL_COLUMNS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, i)| *i)
}

// ---------------------------------------------------------------------------
// Tabulated outputs
// ---------------------------------------------------------------------------

pub const IONIZING_COLUMNS: &[&str] = &["log_age", "prod_rate", "halpha", "FUV", "NUV"];

pub const NUMBERS_COLUMNS: &[&str] = &[
    "log_age", "O_hL", "Of_hL", "B_hL", "A_hL", "YSG_hL", "K_hL", "M_hL", "WNH_hL", "WN_hL",
    "WC_hL", "O_lL", "Of_lL", "B_lL", "A_lL", "YSG_lL", "K_lL", "M_lL", "WNH_lL", "WN_lL",
    "WC_lL",
];

pub const YIELDS_COLUMNS: &[&str] = &[
    "log_age", "H_wind", "He_wind", "Z_wind", "E_wind", "E_sn", "H_sn", "He_sn", "Z_sn",
];

pub const SUPERNOVA_COLUMNS: &[&str] = &[
    "log_age", "Ia", "IIP", "II", "Ib", "Ic", "LGRB", "PISNe", "low_mass", "e_Ia", "e_IIP",
    "e_II", "e_Ib", "e_Ic", "e_LGRB", "e_PISNe", "e_low_mass", "age_yrs",
];

pub const STARMASS_COLUMNS: &[&str] = &["log_age", "stellar_mass", "remnant_mass"];

pub const COLOURS_COLUMNS: &[&str] = &[
    "log_age", "V-I", "U", "B", "V", "R", "I", "J", "H", "K", "u", "g", "r", "i", "z", "f300w",
    "f336w", "f435w", "f450w", "f555w", "f606w", "f814w", "prod_rate", "halpha", "FUV", "NUV",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_axis_is_exact() {
        let t = time_bins();
        assert_eq!(t[0], 6.0);
        assert_eq!(t[1], 6.1);
        assert_eq!(t[50], 11.0);
    }

    #[test]
    fn intervals_grow_with_age() {
        let dt = time_intervals();
        assert!((dt[0] - (10f64.powf(6.05) - 10f64.powf(5.95))).abs() < 1e-6);
        assert!(dt.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn bin_index_rounds_and_clamps() {
        assert_eq!(time_bin_index(6.0), 0);
        assert_eq!(time_bin_index(6.96), 10);
        assert_eq!(time_bin_index(11.0), 50);
        assert_eq!(time_bin_index(12.5), 50);
        assert_eq!(time_bin_index(3.0), 0);
    }

    #[test]
    fn hr_axes_span_expected_ranges() {
        assert_eq!(log_t_bins()[0], 0.1);
        assert_eq!(log_t_bins()[99], 10.0);
        assert_eq!(log_l_bins()[0], -2.9);
        assert_eq!(log_l_bins()[99], 7.0);
    }

    #[test]
    fn photometry_columns_resolve() {
        assert_eq!(stellar_column("V"), Some(55));
        assert_eq!(stellar_column("age"), Some(1));
        assert_eq!(stellar_column("nope"), None);
    }
}
