// src/config/mod.rs
// Report settings loaded from inertion.toml, ~/.inertion/config.toml or defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::reporter::{ReportOptions, Verbosity};

pub const CONFIG_FILE: &str = "inertion.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // ── Report output
    pub verbosity: Verbosity,
    /// `None` picks colors when stdout is a terminal
    pub color: Option<bool>,
    pub json: bool,

    // ── Diagnostics
    pub truncate_after: usize,
}

impl Default for Config {
    fn default() -> Self {
        let options = ReportOptions::default();
        Self {
            verbosity: options.verbosity,
            color: None,
            json: false,
            truncate_after: options.truncate_after,
        }
    }
}

impl Config {
    /// Load the first config file found, falling back to defaults
    ///
    /// A file that exists but cannot be read or parsed is reported and
    /// skipped.
    pub fn load() -> Self {
        for path in config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config");
                    return config;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            verbosity: self.verbosity,
            truncate_after: self.truncate_after,
        }
    }
}

/// Candidate config files, in lookup order
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".inertion").join("config.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InertionError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.verbosity, Verbosity::Failures);
        assert_eq!(config.color, None);
        assert!(!config.json);
        assert_eq!(config.truncate_after, 10);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config("verbosity = 2\ncolor = false\ntruncate_after = 4\n");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.verbosity, Verbosity::Checks);
        assert_eq!(config.color, Some(false));
        assert_eq!(config.report_options().truncate_after, 4);
        assert!(!config.json);
    }

    #[test]
    fn test_invalid_verbosity_is_rejected() {
        let file = write_config("verbosity = 7\n");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, InertionError::Toml(_)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let file = write_config("colour = true\n");
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, InertionError::Io(_)));
    }

    #[test]
    fn test_config_paths() {
        let paths = config_paths();
        assert_eq!(paths[0], PathBuf::from("inertion.toml"));
        if paths.len() > 1 {
            assert!(paths[1].ends_with(".inertion/config.toml"));
        }
    }
}
