mod categories;
mod category;
mod favorite;
mod history;
mod init;
mod item;
mod list;
mod prefs;
mod search;
mod share;
mod status;
mod suggest;
mod sync;
mod validate;
mod visit;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::data::{DataSource, Dataset};
use crate::storage::{KvStore, PrefsStorage};
use crate::validate::ValidationReport;

#[derive(Parser)]
#[command(name = "navdir")]
#[command(about = "Local-first AI tools directory with keyword search and ranking")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Show detailed progress
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize navdir in a directory
    Init(init::InitArgs),

    /// Search the directory by keyword
    Search(search::SearchArgs),

    /// Suggest completions for a partial keyword
    Suggest(suggest::SuggestArgs),

    /// List navigation items page by page
    List(list::ListArgs),

    /// Show categories as a list or tree
    Categories(categories::CategoriesArgs),

    /// Add, edit, remove or reorder categories in the data files
    Category(category::CategoryArgs),

    /// Add, edit or remove navigation items in the data files
    Item(item::ItemArgs),

    /// Check the data files for errors and broken references
    Validate(validate::ValidateArgs),

    /// Show data files, load state and local storage usage
    Status(status::StatusArgs),

    /// Manage favorite items
    Favorite(favorite::FavoriteArgs),

    /// Record a visit to an item
    Visit(visit::VisitArgs),

    /// Print an item's share text and record the share
    Share(share::ShareArgs),

    /// Show or edit the search history
    History(history::HistoryArgs),

    /// Show or change user preferences
    Prefs(prefs::PrefsArgs),

    /// Push or pull data files to the remote file store
    Sync(sync::SyncArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let output = OutputConfig {
            json: self.json,
            quiet: self.quiet,
            verbose: self.verbose,
        };

        match self.command {
            Commands::Init(args) => init::run(args, output).await,
            Commands::Search(args) => search::run(args, output).await,
            Commands::Suggest(args) => suggest::run(args, output).await,
            Commands::List(args) => list::run(args, output).await,
            Commands::Categories(args) => categories::run(args, output).await,
            Commands::Category(args) => category::run(args, output).await,
            Commands::Item(args) => item::run(args, output).await,
            Commands::Validate(args) => validate::run(args, output).await,
            Commands::Status(args) => status::run(args, output).await,
            Commands::Favorite(args) => favorite::run(args, output).await,
            Commands::Visit(args) => visit::run(args, output).await,
            Commands::Share(args) => share::run(args, output).await,
            Commands::History(args) => history::run(args, output).await,
            Commands::Prefs(args) => prefs::run(args, output).await,
            Commands::Sync(args) => sync::run(args, output).await,
        }
    }
}

/// Output configuration passed to all commands
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// An initialized navdir directory and its configuration
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    /// Walk up from `start` to the nearest directory holding `.navdir/config.toml`
    pub fn find(start: &Path) -> Result<Self> {
        let start = start
            .canonicalize()
            .with_context(|| format!("Invalid path: {}", start.display()))?;
        let mut current = start.as_path();
        loop {
            let config_path = Config::config_path(current);
            if config_path.exists() {
                let config =
                    Config::load(&config_path).with_context(|| "Failed to load configuration")?;
                return Ok(Self {
                    root: current.to_path_buf(),
                    config,
                });
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        bail!(
            "navdir not initialized in {}. Run `navdir init` first.",
            start.display()
        )
    }

    pub fn data_source(&self) -> DataSource {
        DataSource::from_config(&self.config, &self.root)
    }

    /// Load both stores; problems are logged and left in the stores' load state
    pub fn load_dataset(&self) -> Dataset {
        Dataset::load(&self.data_source())
    }

    /// Load both stores for editing. Any load failure is an error, so a
    /// partial dataset is never written back over the files.
    pub fn load_dataset_for_edit(&self) -> Result<Dataset> {
        let dataset = self.load_dataset();
        let loaded = dataset.categories.load_state().is_loaded()
            && dataset.navigations.load_state().is_loaded();
        if !dataset.is_healthy() || !loaded {
            bail!(
                "Data did not load cleanly, refusing to edit: {}\nRun `navdir validate` for details.",
                dataset.errors.join("; ")
            );
        }
        Ok(dataset)
    }

    pub fn open_store(&self) -> Result<KvStore> {
        let path = Config::store_path(&self.root);
        KvStore::open(&path).context("Failed to open local store")
    }

    pub fn prefs<'a>(&self, store: &'a KvStore) -> PrefsStorage<'a> {
        PrefsStorage::new(store, &self.config.storage.prefix)
            .with_history_ttl_days(self.config.search.history_ttl_days)
    }
}

/// Print data-load failures for human output; commands still run on
/// whatever did load
pub(crate) fn warn_load_errors(dataset: &Dataset, output: OutputConfig) {
    if output.json || output.quiet {
        return;
    }
    for error in &dataset.errors {
        eprintln!("{} {}", "!".yellow(), error);
    }
}

/// Fail with the report's errors; warnings are only logged
pub(crate) fn reject_invalid(what: &str, report: &ValidationReport) -> Result<()> {
    for warning in &report.warnings {
        tracing::warn!("{what}: {warning}");
    }
    if report.is_valid() {
        return Ok(());
    }
    let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
    bail!("Invalid {what}: {}", errors.join("; "))
}

/// Shorten `text` to at most `max` characters, marking the cut with "..."
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
