use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{reject_invalid, OutputConfig, Project};
use crate::data::Dataset;
use crate::store::{NavigationCommand, NavigationEvent};
use crate::types::{CreateNavigation, Navigation, UpdateNavigation};
use crate::validate::validate_navigation;

#[derive(Args)]
pub struct ItemArgs {
    #[command(subcommand)]
    command: ItemCommands,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    path: PathBuf,
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add a navigation item
    Add {
        title: String,
        url: String,

        /// Category the item belongs to
        #[arg(long, short = 'c')]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Icon URL
        #[arg(long)]
        icon: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        #[arg(long)]
        featured: bool,
    },

    /// Change fields of an item; omitted fields stay as they are
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long, short = 'c')]
        category: Option<String>,

        /// Replaces all tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        #[arg(long, value_name = "BOOL")]
        featured: Option<bool>,

        /// Hide (false) or show (true) the item
        #[arg(long, value_name = "BOOL")]
        active: Option<bool>,
    },

    /// Delete an item
    Remove { id: String },
}

#[derive(Serialize)]
struct ItemChange<'a> {
    action: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<&'a Navigation>,
    files: usize,
}

fn ensure_category(dataset: &Dataset, id: &str) -> Result<()> {
    if dataset.categories.get(id).is_none() {
        bail!("Category not found: {id}");
    }
    Ok(())
}

pub async fn run(args: ItemArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let mut dataset = project.load_dataset_for_edit()?;

    let command = match args.command {
        ItemCommands::Add {
            title,
            url,
            category,
            description,
            icon,
            tags,
            featured,
        } => {
            ensure_category(&dataset, &category)?;
            NavigationCommand::Create(CreateNavigation {
                title,
                description,
                url,
                icon,
                category_id: category,
                tags,
                featured,
            })
        }
        ItemCommands::Edit {
            id,
            title,
            url,
            description,
            icon,
            category,
            tags,
            featured,
            active,
        } => {
            if let Some(category) = &category {
                ensure_category(&dataset, category)?;
            }
            NavigationCommand::Update {
                id,
                changes: UpdateNavigation {
                    title,
                    description,
                    url,
                    icon,
                    category_id: category,
                    tags: (!tags.is_empty()).then_some(tags),
                    featured,
                    is_active: active,
                },
            }
        }
        ItemCommands::Remove { id } => NavigationCommand::Delete(id),
    };

    let (action, id, item) = match dataset.navigations.apply(command) {
        NavigationEvent::Created(item) => ("created", item.id.clone(), Some(item)),
        NavigationEvent::Updated(item) => ("updated", item.id.clone(), Some(item)),
        NavigationEvent::Deleted(id) => ("deleted", id, None),
        NavigationEvent::NotFound(id) => bail!("Navigation item not found: {id}"),
        other => bail!("Unexpected navigation event: {other:?}"),
    };
    if let Some(item) = &item {
        reject_invalid("item", &validate_navigation(item))?;
    }

    let files = project
        .data_source()
        .save_navigations(dataset.navigations.items(), project.config.data.items_per_file)?;
    tracing::debug!(action, id = %id, files = files.len(), "Saved navigation edit");

    if output.json {
        let json_output = ItemChange {
            action,
            id: &id,
            item: item.as_ref(),
            files: files.len(),
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        match &item {
            Some(item) => println!(
                "{} {} {} ({})",
                "✓".green(),
                capitalize(action),
                item.title.bold(),
                id.dimmed()
            ),
            None => println!("{} Deleted {}", "✓".green(), id),
        }
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
