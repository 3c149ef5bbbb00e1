use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{OutputConfig, Project};
use crate::data::DataSource;
use crate::remote::{ApiUsage, Commit, FileStoreClient, Repository};

#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    command: SyncCommands,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    path: PathBuf,
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Upload the local data files to the remote repository
    Push {
        /// List what would be uploaded without contacting the remote
        #[arg(long)]
        dry_run: bool,

        /// Upload only this data file (e.g. categories.json)
        #[arg(long)]
        file: Option<String>,
    },

    /// Download the remote data files into the local data directory
    Pull {
        /// Overwrite local files that differ
        #[arg(long)]
        force: bool,
    },

    /// Check credentials, repository access and rate limits
    Check,

    /// Copy a remote file to a backup path
    Backup {
        /// Remote file path
        file: String,

        /// Backup path (defaults to `<file>.backup.<millis>`)
        #[arg(long)]
        to: Option<String>,
    },

    /// Overwrite a remote file with the content of a backup
    Restore { backup: String, target: String },

    /// Delete a remote file, e.g. a navigation page left over after edits
    Delete {
        /// Remote file path
        file: String,

        /// Commit message
        #[arg(long, short = 'm')]
        message: Option<String>,
    },

    /// Show recent commits touching the remote data
    Log {
        /// Limit to one remote file
        #[arg(long)]
        file: Option<String>,

        #[arg(long, short = 'n', default_value = "10")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct TransferOutput {
    direction: &'static str,
    remote_path: String,
    files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
    dry_run: bool,
}

#[derive(Serialize)]
struct CheckOutput {
    base_url: String,
    branch: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<Repository>,
    usage: ApiUsage,
}

#[derive(Serialize)]
struct FileOutput<'a> {
    path: &'a str,
    sha: &'a str,
}

pub async fn run(args: SyncArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let remote = &project.config.remote;
    let source = project.data_source();

    if let SyncCommands::Push {
        dry_run: true,
        file,
    } = &args.command
    {
        let files = select_files(local_data_files(&source)?, file.as_deref())?;
        return print_transfer(
            TransferOutput {
                direction: "push",
                remote_path: remote.data_path.clone(),
                files: files.into_keys().collect(),
                skipped: Vec::new(),
                dry_run: true,
            },
            output,
        );
    }

    let client = FileStoreClient::new(remote).context("Remote is not configured")?;

    match args.command {
        SyncCommands::Push { file: Some(only), .. } => {
            let files = select_files(local_data_files(&source)?, Some(only.as_str()))?;
            let mut written = Vec::with_capacity(files.len());
            for (name, value) in &files {
                let path = format!("{}/{name}", remote.data_path.trim_end_matches('/'));
                let saved = client.save_json(&path, value, &format!("Sync {name}")).await?;
                written.push(saved.path);
            }
            print_transfer(
                TransferOutput {
                    direction: "push",
                    remote_path: remote.data_path.clone(),
                    files: written,
                    skipped: Vec::new(),
                    dry_run: false,
                },
                output,
            )?;
        }
        SyncCommands::Push { file: None, .. } => {
            let files = local_data_files(&source)?;
            if files.is_empty() {
                bail!("No data files found in {}", source.dir.display());
            }
            let written = client.sync_to_remote(&files, &remote.data_path).await?;
            print_transfer(
                TransferOutput {
                    direction: "push",
                    remote_path: remote.data_path.clone(),
                    files: written.into_iter().map(|f| f.path).collect(),
                    skipped: Vec::new(),
                    dry_run: false,
                },
                output,
            )?;
        }
        SyncCommands::Pull { force } => {
            let files = client.sync_from_remote(&remote.data_path).await?;
            let (written, skipped) = write_local_files(&source.dir, &files, force)?;
            print_transfer(
                TransferOutput {
                    direction: "pull",
                    remote_path: remote.data_path.clone(),
                    files: written,
                    skipped,
                    dry_run: false,
                },
                output,
            )?;
        }
        SyncCommands::Check => {
            let repository = client.get_repository().await;
            let usage = client.api_usage().await;
            let json_output = CheckOutput {
                base_url: client.base_url().to_string(),
                branch: client.branch().to_string(),
                valid: repository.is_ok(),
                repository: repository.as_ref().ok().cloned(),
                usage,
            };
            if output.json {
                println!("{}", serde_json::to_string_pretty(&json_output)?);
            } else if !output.quiet {
                match &repository {
                    Ok(repo) => {
                        println!("{} Connected to {}", "✓".green(), repo.full_name.bold());
                        println!("  URL:       {}", repo.html_url.blue());
                        println!("  Branch:    {}", json_output.branch);
                        println!("  Private:   {}", repo.private);
                    }
                    Err(e) => println!("{} Cannot reach repository: {}", "✗".red(), e),
                }
                println!(
                    "  API quota: {}/{}",
                    json_output.usage.remaining, json_output.usage.limit
                );
            }
            if let Err(e) = repository {
                bail!("Remote check failed: {e}");
            }
        }
        SyncCommands::Backup { file, to } => {
            if !client.file_exists(&file).await? {
                bail!("Remote file not found: {file}");
            }
            let backup = client.backup_file(&file, to.as_deref()).await?;
            print_file("Backed up to", &backup.path, &backup.sha, output)?;
        }
        SyncCommands::Restore { backup, target } => {
            let restored = client.restore_file(&backup, &target).await?;
            print_file("Restored", &restored.path, &restored.sha, output)?;
        }
        SyncCommands::Delete { file, message } => {
            let message = message.unwrap_or_else(|| format!("Delete {file}"));
            client.delete_path(&file, &message).await?;
            tracing::info!(path = %file, "Deleted remote file");
            if output.json {
                let json_output = BTreeMap::from([("deleted", file.as_str())]);
                println!("{}", serde_json::to_string_pretty(&json_output)?);
            } else if !output.quiet {
                println!("{} Deleted {}", "✓".green(), file.cyan());
            }
        }
        SyncCommands::Log { file, limit } => {
            let commits = client.commits(file.as_deref(), limit).await?;
            print_commits(&commits, output)?;
        }
    }

    Ok(())
}

/// The categories file and every navigation file, keyed by file name
fn local_data_files(source: &DataSource) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut paths = vec![source.categories_path()];
    paths.extend(source.navigation_paths()?);

    let mut files = BTreeMap::new();
    for path in paths {
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        files.insert(name, value);
    }
    Ok(files)
}

/// Narrow to one file when `only` names one; it must be a local data file
fn select_files(
    mut files: BTreeMap<String, serde_json::Value>,
    only: Option<&str>,
) -> Result<BTreeMap<String, serde_json::Value>> {
    let Some(name) = only else {
        return Ok(files);
    };
    match files.remove(name) {
        Some(value) => Ok(BTreeMap::from([(name.to_string(), value)])),
        None => bail!(
            "Not a local data file: {name} (expected one of: {})",
            files.keys().cloned().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Returns (written, skipped) file names. Existing files with different
/// content are skipped unless `force` is set.
fn write_local_files(
    dir: &Path,
    files: &BTreeMap<String, serde_json::Value>,
    force: bool,
) -> Result<(Vec<String>, Vec<String>)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = Vec::new();
    let mut skipped = Vec::new();
    for (name, value) in files {
        let path = dir.join(name);
        let content = serde_json::to_string_pretty(value)?;
        if path.exists() && !force {
            let existing: Option<serde_json::Value> = std::fs::read_to_string(&path)
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok());
            if existing.as_ref() != Some(value) {
                skipped.push(name.clone());
                continue;
            }
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(name.clone());
    }
    Ok((written, skipped))
}

fn print_transfer(result: TransferOutput, output: OutputConfig) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    let verb = match (result.direction, result.dry_run) {
        ("push", true) => "Would push",
        ("push", false) => "Pushed",
        _ => "Pulled",
    };
    println!(
        "{} {} {} files ({})",
        "✓".green(),
        verb,
        result.files.len(),
        result.remote_path.cyan()
    );
    for file in &result.files {
        println!("  {}", file);
    }
    if !result.skipped.is_empty() {
        println!(
            "{} Kept {} local files that differ from the remote (use --force to overwrite):",
            "!".yellow(),
            result.skipped.len()
        );
        for file in &result.skipped {
            println!("  {}", file.dimmed());
        }
    }
    Ok(())
}

fn print_file(label: &str, path: &str, sha: &str, output: OutputConfig) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(&FileOutput { path, sha })?);
    } else if !output.quiet {
        println!("{} {} {}", "✓".green(), label, path.cyan());
    }
    Ok(())
}

fn print_commits(commits: &[Commit], output: OutputConfig) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(commits)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }
    if commits.is_empty() {
        println!("{} No commits", "!".yellow());
    }
    for commit in commits {
        let short = &commit.sha[..commit.sha.len().min(8)];
        let subject = commit.commit.message.lines().next().unwrap_or_default();
        println!(
            "{}  {}  {}  {}",
            short.yellow(),
            commit.commit.author.date.dimmed(),
            commit.commit.author.name,
            subject
        );
    }
    Ok(())
}
