//! rulecml CLI tool.
//!
//! Usage:
//! ```bash
//! rulecml convert --rules rules.json --products products.json --api-name QuoteModel
//! rulecml init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Converts configuration rules and product catalogs into CML models
#[derive(Parser)]
#[command(name = "rulecml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert rule records into CML files
    Convert {
        /// JSON array of rule records
        #[arg(short, long)]
        rules: PathBuf,

        /// JSON object of catalog products keyed by id
        #[arg(short, long)]
        products: PathBuf,

        /// Expression-set API name (overrides `output.api_name`)
        #[arg(short, long)]
        api_name: Option<String>,

        /// Output directory (overrides `output.dir`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Associations table from a previous run, reused for stable names
        #[arg(short, long)]
        ledger: Option<PathBuf>,

        /// Extra product ids to include (comma-separated)
        #[arg(short = 'x', long, value_delimiter = ',')]
        additional_products: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for the conversion summary.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Convert {
            rules,
            products,
            api_name,
            out,
            ledger,
            additional_products,
            format,
        } => {
            let source = config_resolver::resolve(Path::new("."), cli.config.as_deref());
            let args = commands::convert::ConvertArgs {
                rules,
                products,
                api_name,
                out,
                ledger,
                additional_products,
                format,
            };
            commands::convert::run(args, &source)
        }
        Commands::Init { force } => commands::init::run(Path::new("."), force),
    }
}
