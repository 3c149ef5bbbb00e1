use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::OutputConfig;
use crate::config::Config;
use crate::storage::KvStore;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Overwrite existing configuration and local store
    #[arg(long)]
    force: bool,
}

#[derive(Serialize)]
struct InitOutput {
    status: String,
    path: String,
    config: String,
    store: String,
    data: String,
}

pub async fn run(args: InitArgs, output: OutputConfig) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", args.path.display()))?;

    let state_dir = Config::data_dir(&root);
    let config_path = Config::config_path(&root);
    let store_path = Config::store_path(&root);
    let config = Config::default();
    let content_dir = config.content_dir(&root);

    let json_output = |status: &str| InitOutput {
        status: status.to_string(),
        path: state_dir.display().to_string(),
        config: config_path.display().to_string(),
        store: store_path.display().to_string(),
        data: content_dir.display().to_string(),
    };

    if config_path.exists() && !args.force {
        if output.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json_output("already_initialized"))?
            );
            return Ok(());
        }
        bail!(
            "navdir already initialized in {}. Use --force to reinitialize.",
            state_dir.display()
        );
    }

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create state directory: {}", state_dir.display()))?;

    config.save(&config_path)?;
    if output.verbose && !output.quiet && !output.json {
        println!("  Creating config: {}", config_path.display());
    }

    if args.force && store_path.exists() {
        std::fs::remove_file(&store_path).with_context(|| {
            format!("Failed to remove existing store: {}", store_path.display())
        })?;
    }
    KvStore::open(&store_path)
        .with_context(|| format!("Failed to initialize store: {}", store_path.display()))?;
    if output.verbose && !output.quiet && !output.json {
        println!("  Creating store: {}", store_path.display());
    }

    let gitignore_path = root.join(".gitignore");
    if gitignore_path.exists() {
        let content = std::fs::read_to_string(&gitignore_path)?;
        if !content.contains(".navdir") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            use std::io::Write;
            writeln!(file, "\n# navdir local state\n.navdir/")?;

            if output.verbose && !output.quiet && !output.json {
                println!("  Updated .gitignore");
            }
        }
    }

    if output.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json_output("initialized"))?
        );
    } else if !output.quiet {
        println!("{} navdir initialized in {}", "✓".green(), state_dir.display());
        println!("  Config: {}", config_path.display());
        println!("  Store:  {}", store_path.display());
        println!("  Data:   {}", content_dir.display());
        if !content_dir.exists() {
            println!(
                "\n{} Data directory does not exist yet; add categories.json and navigation_*.json there.",
                "!".yellow()
            );
        }
        println!("\nNext steps:");
        println!("  {} to check the data files", "navdir validate".cyan());
        println!("  {} to search", "navdir search <query>".cyan());
    }

    Ok(())
}
