use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::data::{update_checksum, DataSource};
use crate::validate::{validate_data_dir, Issue};

#[derive(Args)]
pub struct ValidateArgs {
    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,

    /// Recompute `meta.checksum` in every navigation file before checking
    #[arg(long)]
    fix_checksums: bool,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    valid: bool,
    data_dir: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fixed: Vec<String>,
    errors: &'a [Issue],
    warnings: &'a [Issue],
}

pub async fn run(args: ValidateArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let source = project.data_source();
    let fixed = if args.fix_checksums {
        fix_checksums(&source)?
    } else {
        Vec::new()
    };
    let report = validate_data_dir(&source);
    let valid = report.is_valid() && !(args.strict && !report.warnings.is_empty());

    if output.json {
        let json_output = ValidateOutput {
            valid,
            data_dir: source.dir.display().to_string(),
            fixed,
            errors: &report.errors,
            warnings: &report.warnings,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        for name in &fixed {
            println!("{} Updated checksum in {}", "✓".green(), name.cyan());
        }
        let mark = if valid { "✓".green() } else { "✗".red() };
        println!("{} Checked {}", mark, source.dir.display());
        println!("{report}");
    }

    if !valid {
        bail!(
            "Validation failed: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
    }
    Ok(())
}

/// Rewrite stale checksums; returns the names of the files changed.
/// Unreadable files are left for the validator to report.
fn fix_checksums(source: &DataSource) -> Result<Vec<String>> {
    let mut fixed = Vec::new();
    for path in source.navigation_paths()? {
        match update_checksum(&path) {
            Ok(Some(_)) => fixed.push(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping checksum update: {}", e),
        }
    }
    Ok(fixed)
}
