use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::config::Config;
use crate::data::{ChecksumStatus, FileSummary};
use crate::storage::{format_size, StorageUsage};
use crate::store::LoadState;

#[derive(Args)]
pub struct StatusArgs {
    /// Show per-file details
    #[arg(long)]
    detailed: bool,

    /// Directory to check status in (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct StatusOutput {
    status: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<DataStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
}

#[derive(Serialize)]
struct DataStatus {
    dir: String,
    categories: LoadState,
    navigations: LoadState,
    category_count: usize,
    navigation_count: usize,
    active_count: usize,
    featured_count: usize,
    tag_count: usize,
    files: Vec<FileSummary>,
}

pub async fn run(args: StatusArgs, output: OutputConfig) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", args.path.display()))?;

    if !Config::config_path(&root).exists() {
        if output.json {
            let json_output = StatusOutput {
                status: "not_initialized".to_string(),
                path: root.display().to_string(),
                data: None,
                storage: None,
                remote: None,
            };
            println!("{}", serde_json::to_string_pretty(&json_output)?);
        } else if !output.quiet {
            println!(
                "{} navdir not initialized in {}",
                "!".yellow(),
                root.display()
            );
            println!("Run `navdir init` to initialize.");
        }
        return Ok(());
    }

    let project = Project::find(&root)?;
    let dataset = project.load_dataset();
    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let usage = prefs.usage()?;

    let items = dataset.navigations.items();
    let data = DataStatus {
        dir: project.data_source().dir.display().to_string(),
        categories: dataset.categories.load_state().clone(),
        navigations: dataset.navigations.load_state().clone(),
        category_count: dataset.categories.flattened().len(),
        navigation_count: items.len(),
        active_count: items.iter().filter(|n| n.is_active).count(),
        featured_count: items.iter().filter(|n| n.featured).count(),
        tag_count: dataset.navigations.all_tags().len(),
        files: dataset.files.clone(),
    };
    let remote = &project.config.remote;
    let remote_label = remote
        .is_configured()
        .then(|| format!("{}/{}@{}", remote.owner, remote.repo, remote.branch));
    let status = if dataset.is_healthy() { "ready" } else { "degraded" };

    if output.json {
        let json_output = StatusOutput {
            status: status.to_string(),
            path: project.root.display().to_string(),
            data: Some(data),
            storage: Some(usage),
            remote: remote_label,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    let mark = if dataset.is_healthy() { "✓".green() } else { "!".yellow() };
    println!("{} navdir status for {}", mark, project.root.display());
    println!();
    let state_label = if dataset.is_healthy() {
        "Ready".green()
    } else {
        "Degraded".yellow()
    };
    println!("  Status:      {}", state_label);
    println!("  Data dir:    {}", data.dir);
    println!("  Categories:  {}", data.category_count.to_string().cyan());
    println!(
        "  Items:       {} ({} active, {} featured)",
        data.navigation_count.to_string().cyan(),
        data.active_count,
        data.featured_count
    );
    println!("  Tags:        {}", data.tag_count);
    println!("  Data files:  {}", data.files.len());
    println!(
        "  Storage:     {} of {} ({}%)",
        format_size(usage.used),
        format_size(usage.total),
        usage.percentage
    );
    match &remote_label {
        Some(label) => println!("  Remote:      {}", label.cyan()),
        None => println!("  Remote:      {}", "not configured".dimmed()),
    }

    for error in &dataset.errors {
        println!("  {} {}", "!".yellow(), error);
    }

    if args.detailed && !data.files.is_empty() {
        println!("\n  Files:");
        for file in &data.files {
            let checksum = match &file.checksum {
                ChecksumStatus::Verified => "verified".green(),
                ChecksumStatus::Missing => "no checksum".yellow(),
                ChecksumStatus::Skipped => "not checked".dimmed(),
                ChecksumStatus::Mismatch { .. } => "mismatch".red(),
            };
            println!(
                "    {} #{}: {} items ({} active), updated {}, {}",
                file.path.blue(),
                file.file_index,
                file.items,
                file.active_items,
                file.last_update,
                checksum
            );
        }
    }

    Ok(())
}
