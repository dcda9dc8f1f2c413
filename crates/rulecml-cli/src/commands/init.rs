//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::Path;

const CONFIG_FILE: &str = "rulecml.toml";

const DEFAULT_CONFIG: &str = r#"# rulecml configuration

[generator]
# Type every product type extends
base_type_name = "LineItem"

# Synthetic root type for transaction-level rules
virtual_root_name = "VirtualQuote"

# Generated type names are cut to this length
max_name_length = 80

# Product ids per catalog fetch
fetch_chunk_size = 20

# Severity of messages that declare none (Info, Warning, Error)
default_message_severity = "Info"

# Tags whose attributes are declared as int
integer_tags = ["LineItemQuantity"]

# Upper cardinality of required components without a maximum
# required_max_quantity = 9999

[output]
# Directory for .cml and _Associations.csv files (default: current directory)
# dir = "./cml"

# Expression-set API name; --api-name overrides it
# api_name = "QuoteModel"
"#;

/// Runs the init command, writing `rulecml.toml` into `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {CONFIG_FILE}");
    println!("\nNext steps:");
    println!("  1. Set output.api_name in {CONFIG_FILE}");
    println!("  2. Run: rulecml convert --rules rules.json --products products.json");

    Ok(())
}
