//! Convert command implementation.

use anyhow::{anyhow, Context, Result};
use rulecml_core::cml::{parse_associations_csv, Association};
use rulecml_core::{load_records, Artifact, ArtifactSink, Converter, SinkError, StaticCatalog};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::output;
use crate::config_resolver::{self, ConfigSource};
use crate::OutputFormat;

const LEDGER_SUFFIX: &str = "_Associations.csv";

/// Arguments of `rulecml convert`.
#[derive(Debug)]
pub struct ConvertArgs {
    /// Rule records file.
    pub rules: PathBuf,
    /// Catalog file.
    pub products: PathBuf,
    /// Overrides `output.api_name`.
    pub api_name: Option<String>,
    /// Overrides `output.dir`.
    pub out: Option<PathBuf>,
    /// Associations file, or a directory of them.
    pub ledger: Option<PathBuf>,
    /// Extra product ids.
    pub additional_products: Vec<String>,
    /// Summary format.
    pub format: OutputFormat,
}

/// Runs the convert command.
pub fn run(args: ConvertArgs, source: &ConfigSource) -> Result<()> {
    let config = config_resolver::load(source)?;

    let api_name = args
        .api_name
        .or_else(|| config.output.api_name.clone())
        .context("No API name given. Pass --api-name or set output.api_name")?;
    let out_dir = args
        .out
        .or_else(|| config.output.dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let records = read(&args.rules)?;
    let loaded = load_records(&records)
        .with_context(|| format!("Failed to load rules: {}", args.rules.display()))?;
    info!("Loaded {} rule(s) from {}", loaded.rules.len(), args.rules.display());

    let catalog = StaticCatalog::from_json(&read(&args.products)?)
        .with_context(|| format!("Failed to load catalog: {}", args.products.display()))?;
    debug!("Catalog holds {} product(s)", catalog.len());

    // The whole file is in scope, not only what the rules mention.
    let mut additional: Vec<String> = catalog.ids().map(ToString::to_string).collect();
    additional.extend(args.additional_products);

    let ledger = match &args.ledger {
        Some(path) => read_ledger(path)?,
        None => Vec::new(),
    };

    let converter = Converter::builder()
        .config(config.generator)
        .provider(catalog)
        .api_name(api_name)
        .ledger(ledger)
        .additional_product_ids(additional)
        .build()
        .map_err(|e| anyhow!("{:?}", miette::Report::new(e)))?;

    let result = converter
        .convert(loaded.rules)
        .map_err(|e| anyhow!("{:?}", miette::Report::new(e)))?;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut sink = FileSink::new(&out_dir);
    result.persist(&mut sink)?;

    output::print(&result, &loaded.failures, &sink.written, args.format)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Reads one associations table, or every `*_Associations.csv` in a directory.
fn read_ledger(path: &Path) -> Result<Vec<Association>> {
    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(LEDGER_SUFFIX))
            })
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut associations = Vec::new();
    for file in &files {
        let parsed = parse_associations_csv(&read(file)?)
            .with_context(|| format!("Failed to parse ledger: {}", file.display()))?;
        debug!("Ledger {}: {} row(s)", file.display(), parsed.len());
        associations.extend(parsed);
    }
    info!(
        "Reusing {} association(s) from {} ledger file(s)",
        associations.len(),
        files.len()
    );
    Ok(associations)
}

// ────────────────────────────────────────────
// File sink
// ────────────────────────────────────────────

/// Writes artifacts as files into one directory.
struct FileSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl FileSink {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        }
    }

    fn write(&mut self, name: &str, content: &str) -> Result<(), SinkError> {
        let path = self.dir.join(name);
        std::fs::write(&path, content).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        self.written.push(path);
        Ok(())
    }
}

impl ArtifactSink for FileSink {
    fn persist(&mut self, artifact: &Artifact) -> Result<(), SinkError> {
        self.write(&artifact.cml_file_name(), &artifact.cml)?;
        self.write(&artifact.associations_file_name(), &artifact.associations_csv)?;
        info!(
            "Wrote {} and {}",
            artifact.cml_file_name(),
            artifact.associations_file_name()
        );
        Ok(())
    }
}
