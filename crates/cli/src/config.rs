//! `tagmod.toml` run configuration.
//!
//! Every section and key is optional; command-line flags take precedence.
//!
//! # Example
//!
//! ```toml
//! [run]
//! rules = "modifications.txt"
//! seed = 42
//!
//! [paths]
//! input = "data/osm_download_${CITY}.xml"
//! output = "data/osm_download_${CITY}_${SCENARIO}.xml"
//!
//! [log]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "tagmod.toml";
pub const DEFAULT_RULES: &str = "modifications.txt";
/// Input and output format follow the file extension (`.xml`/`.osm` or `.json`).
pub const DEFAULT_INPUT: &str = "data/osm_download_${CITY}.xml";
pub const DEFAULT_OUTPUT: &str = "data/osm_download_${CITY}_${SCENARIO}.xml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub run: RunSettings,
    pub paths: PathSettings,
    pub log: LogSettings,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub rules: Option<PathBuf>,
    /// Seed for frequency gates; entropy when absent
    pub seed: Option<u64>,
}

/// `[paths]` section. Values are templates over `CITY` and `SCENARIO`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    pub input: Option<String>,
    pub output: Option<String>,
}

/// `[log]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// An `EnvFilter` directive such as `info` or `tagmod_eval=debug`
    pub level: Option<String>,
}

impl Config {
    pub fn rules_path(&self) -> PathBuf {
        self.run
            .rules
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES))
    }

    pub fn input_template(&self) -> &str {
        self.paths.input.as_deref().unwrap_or(DEFAULT_INPUT)
    }

    pub fn output_template(&self) -> &str {
        self.paths.output.as_deref().unwrap_or(DEFAULT_OUTPUT)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

pub fn read_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read config '{}': {}", path.display(), e))?;

    toml::from_str(&content)
        .map_err(|e| format!("could not parse config '{}': {}", path.display(), e))
}

/// Load the config named on the command line, or `tagmod.toml` from the
/// working directory if present. Only an explicitly named file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                read_config(path)
            } else {
                Ok(Config::default())
            }
        }
    }
}
