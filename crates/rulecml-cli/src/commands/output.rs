//! Conversion summary formatting.

use anyhow::Result;
use rulecml_core::rules::RecordFailure;
use rulecml_core::ConversionResult;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::OutputFormat;

/// Print the conversion summary in the specified format.
pub fn print(
    result: &ConversionResult,
    failures: &[RecordFailure],
    written: &[PathBuf],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(result, failures, written),
        OutputFormat::Json => return print_json(result, failures, written),
    }
    Ok(())
}

fn print_text(result: &ConversionResult, failures: &[RecordFailure], written: &[PathBuf]) {
    for failure in failures {
        println!(
            "\x1b[31merror\x1b[0m record {}: {}",
            failure.api_name, failure.reason
        );
    }

    for cluster in &result.clusters {
        println!(
            "{} ({} rule(s), {} compiled)",
            cluster.artifact.cml_file_name(),
            cluster.rules.len(),
            cluster.report.rules_compiled
        );
        for skipped in &cluster.report.rules_skipped {
            println!(
                "  \x1b[33mwarning\x1b[0m skipped {}: {}",
                skipped.api_name, skipped.reason
            );
        }
        for skipped in &cluster.report.actions_skipped {
            println!(
                "  \x1b[33mwarning\x1b[0m skipped {} action in {}: {}",
                skipped.action, skipped.api_name, skipped.reason
            );
        }
    }

    for group in &result.unmatched {
        println!(
            "\x1b[34minfo\x1b[0m no product for {}: {}",
            group.key,
            group.rules.join(", ")
        );
    }

    if !written.is_empty() {
        println!();
        for path in written {
            println!("  wrote {}", path.display());
        }
    }

    let skipped = result.rules_skipped() + failures.len();
    let summary_color = if !failures.is_empty() {
        "\x1b[31m"
    } else if skipped > 0 || result.actions_skipped() > 0 || !result.unmatched.is_empty() {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Compiled {} rule(s) into {} model(s), {} skipped, {} unmatched group(s), {} product(s) fetched\x1b[0m",
        summary_color,
        result.rules_compiled(),
        result.clusters.len(),
        skipped,
        result.unmatched.len(),
        result.products_fetched
    );
}

#[derive(Serialize)]
struct Summary<'a> {
    #[serde(flatten)]
    result: &'a ConversionResult,
    load_failures: Vec<LoadFailure<'a>>,
    written: Vec<&'a Path>,
}

#[derive(Serialize)]
struct LoadFailure<'a> {
    api_name: &'a str,
    reason: &'a str,
}

fn summary<'a>(
    result: &'a ConversionResult,
    failures: &'a [RecordFailure],
    written: &'a [PathBuf],
) -> Summary<'a> {
    Summary {
        result,
        load_failures: failures
            .iter()
            .map(|f| LoadFailure {
                api_name: &f.api_name,
                reason: &f.reason,
            })
            .collect(),
        written: written.iter().map(PathBuf::as_path).collect(),
    }
}

fn print_json(
    result: &ConversionResult,
    failures: &[RecordFailure],
    written: &[PathBuf],
) -> Result<()> {
    let json = serde_json::to_string_pretty(&summary(result, failures, written))?;
    println!("{json}");
    Ok(())
}
