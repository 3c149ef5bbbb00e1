use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::data::Dataset;
use crate::types::Navigation;
use crate::user::UserProfile;

#[derive(Args)]
pub struct FavoriteArgs {
    #[command(subcommand)]
    command: FavoriteCommands,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    path: PathBuf,
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Mark an item as favorite
    Add { id: String },

    /// Unmark an item
    Remove { id: String },

    /// Flip the favorite mark of an item
    Toggle { id: String },

    /// Show all favorites
    List,
}

#[derive(Serialize)]
struct FavoriteChange<'a> {
    id: &'a str,
    favorite: bool,
    changed: bool,
    favorite_count: u64,
}

#[derive(Serialize)]
struct FavoriteEntry<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<&'a Navigation>,
}

pub async fn run(args: FavoriteArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let dataset = project.load_dataset();
    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let mut profile = UserProfile::load(&prefs, &project.config.user)?;

    let (id, changed) = match &args.command {
        FavoriteCommands::List => {
            let entries: Vec<FavoriteEntry> = profile
                .favorites
                .iter()
                .map(|id| FavoriteEntry {
                    id,
                    item: dataset.navigations.get(id),
                })
                .collect();
            if output.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if !output.quiet {
                if entries.is_empty() {
                    println!("{} No favorites yet", "!".yellow());
                }
                for entry in &entries {
                    match entry.item {
                        Some(item) => println!(
                            "{} {}  {}",
                            "★".yellow(),
                            item.title.bold(),
                            item.url.blue()
                        ),
                        None => println!(
                            "{} {}  {}",
                            "★".yellow(),
                            entry.id,
                            "(no longer in the data files)".dimmed()
                        ),
                    }
                }
            }
            return Ok(());
        }
        FavoriteCommands::Add { id } => {
            require_item(&dataset, id)?;
            (id, profile.add_favorite(id))
        }
        FavoriteCommands::Remove { id } => (id, profile.remove_favorite(id)),
        FavoriteCommands::Toggle { id } => {
            if !profile.is_favorite(id) {
                require_item(&dataset, id)?;
            }
            profile.toggle_favorite(id);
            (id, true)
        }
    };

    if changed {
        profile.save(&prefs)?;
    }
    let favorite = profile.is_favorite(id);

    if output.json {
        let json_output = FavoriteChange {
            id,
            favorite,
            changed,
            favorite_count: profile.stats.favorite_count,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        let title = dataset
            .navigations
            .get(id)
            .map_or(id.as_str(), |n| n.title.as_str());
        match (changed, favorite) {
            (true, true) => println!("{} Added {} to favorites", "✓".green(), title.cyan()),
            (true, false) => println!("{} Removed {} from favorites", "✓".green(), title.cyan()),
            (false, true) => println!("{} {} is already a favorite", "!".yellow(), title.cyan()),
            (false, false) => println!("{} {} is not a favorite", "!".yellow(), title.cyan()),
        }
    }

    Ok(())
}

fn require_item(dataset: &Dataset, id: &str) -> Result<()> {
    if dataset.navigations.get(id).is_none() {
        bail!("Navigation item not found: {id}");
    }
    Ok(())
}
