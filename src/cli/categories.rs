use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::{warn_load_errors, OutputConfig, Project};
use crate::store::{CategoryCommand, CategoryStats, CategoryTreeNode};
use crate::types::Category;

#[derive(Args)]
pub struct CategoriesArgs {
    /// Show the parent/child hierarchy
    #[arg(long)]
    tree: bool,

    /// Show only the ancestry of this category
    #[arg(long, conflicts_with = "tree")]
    path_of: Option<String>,

    /// Highlight this category in the tree
    #[arg(long, requires = "tree")]
    select: Option<String>,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct CategoryRow {
    #[serde(flatten)]
    category: Category,
    navigation_count: usize,
    child_count: usize,
}

pub async fn run(args: CategoriesArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let mut dataset = project.load_dataset();
    warn_load_errors(&dataset, output);
    if let Some(id) = &args.select {
        dataset
            .categories
            .apply(CategoryCommand::Select(Some(id.clone())));
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in dataset.navigations.items() {
        *counts.entry(item.category_id.as_str()).or_default() += 1;
    }
    let store = &dataset.categories;

    if let Some(id) = &args.path_of {
        let chain = store.path(id);
        if chain.is_empty() {
            anyhow::bail!("Category not found: {id}");
        }
        if output.json {
            println!("{}", serde_json::to_string_pretty(&chain)?);
        } else if !output.quiet {
            let names: Vec<&str> = chain.iter().map(|c| c.name.as_str()).collect();
            println!("{}", names.join(" > "));
        }
        return Ok(());
    }

    if args.tree {
        let tree = store.tree();
        if output.json {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        } else if !output.quiet {
            if tree.is_empty() {
                println!("{} No categories", "!".yellow());
            }
            print_tree(&tree, &counts, 0);
        }
        return Ok(());
    }

    let items = dataset.navigations.items();
    let rows: Vec<CategoryRow> = store
        .flat_list()
        .into_iter()
        .filter_map(|category| {
            let CategoryStats {
                navigation_count,
                child_count,
                ..
            } = store.stats(&category.id, items)?;
            Some(CategoryRow {
                category,
                navigation_count,
                child_count,
            })
        })
        .collect();

    if output.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if !output.quiet {
        if rows.is_empty() {
            println!("{} No categories", "!".yellow());
            return Ok(());
        }
        for row in &rows {
            let name = if row.category.is_active {
                row.category.name.bold()
            } else {
                row.category.name.dimmed()
            };
            let indent = "  ".repeat(usize::try_from(row.category.level).unwrap_or(0));
            println!(
                "{:<12} {}{}  {}",
                row.category.id.dimmed(),
                indent,
                name,
                format!("({})", row.navigation_count).cyan()
            );
        }
        println!("\n{} categories", rows.len());
    }

    Ok(())
}

fn print_tree(nodes: &[CategoryTreeNode], counts: &HashMap<&str, usize>, depth: usize) {
    for node in nodes {
        let count = counts.get(node.category.id.as_str()).copied().unwrap_or(0);
        let name = if node.disabled {
            node.category.name.dimmed()
        } else if node.selected {
            node.category.name.bold().underline()
        } else {
            node.category.name.normal()
        };
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            if node.children.is_empty() { "-" } else { "+" },
            name,
            format!("({count})").cyan()
        );
        print_tree(&node.children, counts, depth + 1);
    }
}
