use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::BenchError;
use crate::profile::ProfileOptions;
use crate::types::RunConfiguration;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "RENDERBENCH_CONFIG";

/// Optional defaults read from `config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub iterations: Option<u64>,
    pub profile_output: Option<PathBuf>,
    pub top: Option<usize>,
}

impl Settings {
    pub fn from_toml(path: &Path, raw: &str) -> Result<Self, BenchError> {
        toml::from_str(raw).map_err(|e| BenchError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let raw = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &raw)
    }

    /// Load from `explicit`, else `$RENDERBENCH_CONFIG`, else the per-user
    /// config directory. Only the last location may be missing.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, BenchError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `<config_dir>/renderbench/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("renderbench").join("config.toml"))
}

/// Values taken from the command line; `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub filters: Vec<String>,
    pub iterations: Option<u32>,
    pub profile: bool,
    pub profile_output: Option<PathBuf>,
    pub top: Option<usize>,
}

/// Merge command line over settings over built-in defaults.
pub fn resolve(
    cli: CliOverrides,
    settings: &Settings,
) -> Result<(RunConfiguration, ProfileOptions), BenchError> {
    let iterations = match (cli.iterations, settings.iterations) {
        (Some(n), _) => u64::from(n),
        (None, Some(n)) => n,
        (None, None) => u64::from(RunConfiguration::DEFAULT_ITERATIONS.get()),
    };
    let iterations = u32::try_from(iterations)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(BenchError::InvalidIterations { value: iterations })?;

    let defaults = ProfileOptions::default();
    let profile = ProfileOptions {
        output: cli
            .profile_output
            .or_else(|| settings.profile_output.clone())
            .unwrap_or(defaults.output),
        top: cli.top.or(settings.top).unwrap_or(defaults.top),
    };

    let run = RunConfiguration {
        filter_substrings: cli.filters,
        iterations,
        profile_mode: cli.profile,
    };
    Ok((run, profile))
}
