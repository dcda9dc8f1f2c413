//! Configuration types for rulecml.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for rulecml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model generation settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Artifact output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}

/// Settings that shape the generated model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Name of the base type every product type extends.
    #[serde(default = "default_base_type_name")]
    pub base_type_name: String,

    /// Name of the synthetic transaction root type.
    #[serde(default = "default_virtual_root_name")]
    pub virtual_root_name: String,

    /// Maximum length of generated type names.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Maximum number of product ids per catalog fetch.
    #[serde(default = "default_fetch_chunk_size")]
    pub fetch_chunk_size: usize,

    /// Severity of generated messages that declare none.
    #[serde(default = "default_message_severity")]
    pub default_message_severity: String,

    /// Tag names whose on-demand attributes are typed `int`.
    #[serde(default = "default_integer_tags")]
    pub integer_tags: Vec<String>,

    /// Upper cardinality of required components without a maximum.
    #[serde(default = "default_required_max_quantity")]
    pub required_max_quantity: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_type_name: default_base_type_name(),
            virtual_root_name: default_virtual_root_name(),
            max_name_length: default_max_name_length(),
            fetch_chunk_size: default_fetch_chunk_size(),
            default_message_severity: default_message_severity(),
            integer_tags: default_integer_tags(),
            required_max_quantity: default_required_max_quantity(),
        }
    }
}

/// Where and under which name artifacts are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: current directory).
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Expression-set API name used for file names and the associations table.
    #[serde(default)]
    pub api_name: Option<String>,
}

fn default_base_type_name() -> String {
    "LineItem".to_string()
}

fn default_virtual_root_name() -> String {
    "VirtualQuote".to_string()
}

fn default_max_name_length() -> usize {
    80
}

fn default_fetch_chunk_size() -> usize {
    20
}

fn default_message_severity() -> String {
    "Info".to_string()
}

fn default_integer_tags() -> Vec<String> {
    vec!["LineItemQuantity".to_string()]
}

fn default_required_max_quantity() -> u32 {
    9999
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generator.base_type_name, "LineItem");
        assert_eq!(config.generator.max_name_length, 80);
        assert_eq!(config.generator.integer_tags, vec!["LineItemQuantity"]);
        assert!(config.output.api_name.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[generator]
virtual_root_name = "Quote"
fetch_chunk_size = 5

[output]
dir = "./out"
api_name = "Laptops"
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.generator.virtual_root_name, "Quote");
        assert_eq!(config.generator.fetch_chunk_size, 5);
        assert_eq!(config.generator.base_type_name, "LineItem");
        assert_eq!(config.output.dir, Some(PathBuf::from("./out")));
        assert_eq!(config.output.api_name.as_deref(), Some("Laptops"));
    }

    #[test]
    fn test_parse_error() {
        let result = Config::parse("[generator\n");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
