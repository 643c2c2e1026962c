//! Runtime settings: where the BPASS stellar models live and the default
//! CMD grid.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming a JSON settings file.
pub const CONFIG_ENV: &str = "HOKI_CONFIG";

/// Environment variable overriding [`Settings::models_path`].
pub const MODELS_PATH_ENV: &str = "BPASS_MODELS_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the BPASS stellar-model files.
    pub models_path: Option<PathBuf>,
    pub cmd_col_lim: [f64; 2],
    pub cmd_mag_lim: [f64; 2],
    pub cmd_res_el: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_path: None,
            cmd_col_lim: [-3.0, 7.0],
            cmd_mag_lim: [-14.0, 10.0],
            cmd_res_el: 0.1,
        }
    }
}

impl Settings {
    /// Settings from `$HOKI_CONFIG` (if set) with `$BPASS_MODELS_PATH` applied.
    pub fn load() -> Result<Self> {
        let mut settings = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(models) = std::env::var_os(MODELS_PATH_ENV) {
            settings.models_path = Some(PathBuf::from(models));
        }
        log::debug!("settings: {settings:?}");
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing settings {}", path.display()))
    }

    /// An empty CMD with the configured limits.
    pub fn empty_cmd(&self) -> crate::cmd::Cmd {
        crate::cmd::Cmd::new(self.cmd_col_lim, self.cmd_mag_lim, self.cmd_res_el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoki.json");
        std::fs::write(&path, r#"{"models_path": "/data/bpass", "cmd_res_el": 0.2}"#).unwrap();

        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.models_path, Some(PathBuf::from("/data/bpass")));
        assert_eq!(s.cmd_res_el, 0.2);
        assert_eq!(s.cmd_mag_lim, [-14.0, 10.0]);
        assert_eq!(s.empty_cmd().col_range.len(), 50);
    }

    // The only test that touches the process environment.
    #[test]
    fn environment_selects_file_and_models_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoki.json");
        std::fs::write(&path, r#"{"models_path": "/from/file", "cmd_res_el": 0.5}"#).unwrap();

        let saved: Vec<_> = [CONFIG_ENV, MODELS_PATH_ENV]
            .iter()
            .map(|k| (*k, std::env::var_os(k)))
            .collect();
        std::env::set_var(CONFIG_ENV, &path);
        std::env::set_var(MODELS_PATH_ENV, "/from/env");
        let loaded = Settings::load();
        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }

        let s = loaded.unwrap();
        assert_eq!(s.cmd_res_el, 0.5);
        assert_eq!(s.models_path, Some(PathBuf::from("/from/env")));
    }

    #[test]
    fn bad_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoki.json");
        std::fs::write(&path, "{").unwrap();
        assert!(Settings::from_file(&path).is_err());
    }
}
