//! Locating and loading `rulecml.toml`.
//!
//! Lookup order, first hit wins:
//!
//! 1. `--config <path>`
//! 2. `rulecml.toml`, then `.rulecml.toml`, in the project directory
//! 3. `config.toml` in the user config directory
//!    (`$RULECML_CONFIG_DIR`, else `~/.rulecml/`)
//! 4. built-in defaults

use anyhow::{Context, Result};
use rulecml_core::Config;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the user config directory.
pub const CONFIG_DIR_ENV: &str = "RULECML_CONFIG_DIR";

const PROJECT_FILES: [&str; 2] = ["rulecml.toml", ".rulecml.toml"];
const USER_FILE: &str = "config.toml";

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found next to the project.
    Project(PathBuf),
    /// Found in the user config directory.
    User(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// The file to read, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::User(p) => Some(p),
            Self::Default => None,
        }
    }
}

/// Finds the configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, user_config_dir().as_deref())
}

fn resolve_in(
    project_dir: &Path,
    explicit: Option<&Path>,
    user_dir: Option<&Path>,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(found) = PROJECT_FILES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file())
    {
        debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    match user_dir.map(|dir| dir.join(USER_FILE)) {
        Some(found) if found.is_file() => {
            debug!("Found user config: {}", found.display());
            ConfigSource::User(found)
        }
        _ => ConfigSource::Default,
    }
}

/// `$RULECML_CONFIG_DIR`, else `~/.rulecml`.
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => home::home_dir().map(|h| h.join(".rulecml")),
    }
}

/// Reads the configuration `source` points at.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load(source: &ConfigSource) -> Result<Config> {
    let Some(path) = source.path() else {
        debug!("No config file, using defaults");
        return Ok(Config::default());
    };
    if matches!(source, ConfigSource::User(_)) {
        info!("Using user config: {}", path.display());
    }
    Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
}
