use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{reject_invalid, OutputConfig, Project};
use crate::store::{CategoryCommand, CategoryEvent, CategoryStore};
use crate::types::{Category, CreateCategory, UpdateCategory};
use crate::validate::validate_category;

#[derive(Args)]
pub struct CategoryArgs {
    #[command(subcommand)]
    command: CategoryCommands,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    path: PathBuf,
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Add a category, at the root or below --parent
    Add {
        name: String,

        #[arg(long)]
        parent: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        /// #rgb or #rrggbb
        #[arg(long)]
        color: Option<String>,

        /// Position among its siblings (defaults to last)
        #[arg(long)]
        order: Option<i64>,
    },

    /// Change fields of a category; omitted fields stay as they are
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long)]
        color: Option<String>,

        /// Move below this category
        #[arg(long, conflicts_with = "root")]
        parent: Option<String>,

        /// Move to the top level
        #[arg(long)]
        root: bool,

        #[arg(long)]
        order: Option<i64>,

        /// Disable (false) or enable (true) the category
        #[arg(long, value_name = "BOOL")]
        active: Option<bool>,
    },

    /// Delete a category that has no children and no items
    Remove { id: String },

    /// Set display order, e.g. `reorder cat_1=2 cat_2=1`
    Reorder {
        #[arg(required = true, value_name = "ID=ORDER", value_parser = parse_order)]
        orders: Vec<(String, i64)>,
    },
}

#[derive(Serialize)]
struct CategoryChange<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<usize>,
}

fn parse_order(value: &str) -> Result<(String, i64), String> {
    let (id, order) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=ORDER, got {value}"))?;
    let order = order
        .trim()
        .parse()
        .map_err(|_| format!("order must be a whole number: {order}"))?;
    Ok((id.trim().to_string(), order))
}

/// Next free position among the siblings under `parent`
fn next_order(store: &CategoryStore, parent: Option<&str>) -> i64 {
    let siblings = match parent {
        Some(parent) => store.children_of(parent).len(),
        None => store.roots().len(),
    };
    siblings as i64 + 1
}

/// Whether moving `id` below `parent` would make it its own ancestor
fn creates_cycle(store: &CategoryStore, id: &str, parent: &str) -> bool {
    store.path(parent).iter().any(|c| c.id == id)
}

pub async fn run(args: CategoryArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let mut dataset = project.load_dataset_for_edit()?;
    let store = &dataset.categories;

    let command = match args.command {
        CategoryCommands::Add {
            name,
            parent,
            description,
            icon,
            color,
            order,
        } => {
            let order = order.unwrap_or_else(|| next_order(store, parent.as_deref()));
            CategoryCommand::Create(CreateCategory {
                name,
                description,
                icon,
                color,
                parent_id: parent,
                order: Some(order),
            })
        }
        CategoryCommands::Edit {
            id,
            name,
            description,
            icon,
            color,
            parent,
            root,
            order,
            active,
        } => {
            if let Some(parent) = &parent {
                if creates_cycle(store, &id, parent) {
                    bail!("Cannot move {id} below its own descendant {parent}");
                }
            }
            let parent_id = match (parent, root) {
                (Some(parent), _) => Some(Some(parent)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            CategoryCommand::Update {
                id,
                changes: UpdateCategory {
                    name,
                    description,
                    icon,
                    color,
                    parent_id,
                    order,
                    is_active: active,
                },
            }
        }
        CategoryCommands::Remove { id } => {
            let children = store.children_of(&id).len();
            let items = dataset
                .navigations
                .items()
                .iter()
                .filter(|n| n.category_id == id)
                .count();
            if children > 0 || items > 0 {
                bail!("Category {id} still has {children} subcategories and {items} items");
            }
            CategoryCommand::Delete(id)
        }
        CategoryCommands::Reorder { orders } => {
            if let Some((missing, _)) = orders.iter().find(|(id, _)| store.get(id).is_none()) {
                bail!("Category not found: {missing}");
            }
            CategoryCommand::Reorder(orders)
        }
    };

    let event = dataset.categories.apply(command);
    let json_output = match &event {
        CategoryEvent::Created(category) | CategoryEvent::Updated(category) => {
            reject_invalid("category", &validate_category(category))?;
            CategoryChange {
                action: if matches!(event, CategoryEvent::Created(_)) {
                    "created"
                } else {
                    "updated"
                },
                category: Some(category),
                id: None,
                updated: None,
            }
        }
        CategoryEvent::Deleted(id) => CategoryChange {
            action: "deleted",
            category: None,
            id: Some(id),
            updated: None,
        },
        CategoryEvent::Reordered { updated } => CategoryChange {
            action: "reordered",
            category: None,
            id: None,
            updated: Some(*updated),
        },
        CategoryEvent::NotFound(id) => bail!("Category not found: {id}"),
        other => bail!("Unexpected category event: {other:?}"),
    };

    project
        .data_source()
        .save_categories(dataset.categories.categories())?;
    tracing::debug!(action = json_output.action, "Saved category edit");

    if output.json {
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        match (json_output.category, json_output.id, json_output.updated) {
            (Some(category), _, _) => println!(
                "{} {} {} ({})",
                "✓".green(),
                if json_output.action == "created" { "Created" } else { "Updated" },
                category.name.bold(),
                category.id.dimmed()
            ),
            (_, Some(id), _) => println!("{} Deleted {}", "✓".green(), id),
            (_, _, updated) => println!(
                "{} Reordered {} categories",
                "✓".green(),
                updated.unwrap_or_default()
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: &str, parent: Option<&str>) -> Category {
        let level = i64::from(parent.is_some());
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": id,
            "parentId": parent,
            "level": level,
        }))
        .unwrap()
    }

    fn store() -> CategoryStore {
        let mut store = CategoryStore::new();
        store.apply(CategoryCommand::Loaded(vec![
            cat("cat_1", None),
            cat("cat_2", None),
            cat("cat_10", Some("cat_1")),
        ]));
        store
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("cat_1=3").unwrap(), ("cat_1".to_string(), 3));
        assert!(parse_order("cat_1").is_err());
        assert!(parse_order("cat_1=first").is_err());
    }

    #[test]
    fn test_next_order_counts_siblings() {
        let store = store();
        assert_eq!(next_order(&store, None), 3);
        assert_eq!(next_order(&store, Some("cat_1")), 2);
        assert_eq!(next_order(&store, Some("cat_2")), 1);
    }

    #[test]
    fn test_moving_below_descendant_is_a_cycle() {
        let store = store();
        assert!(creates_cycle(&store, "cat_1", "cat_10"));
        assert!(creates_cycle(&store, "cat_1", "cat_1"));
        assert!(!creates_cycle(&store, "cat_10", "cat_2"));
    }
}
