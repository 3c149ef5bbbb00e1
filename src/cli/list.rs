use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{truncate, warn_load_errors, OutputConfig, Project};
use crate::store::{ListFilters, NavigationCommand};
use crate::types::{parse_timestamp, Navigation};
use crate::user::ListSort;

#[derive(Args)]
pub struct ListArgs {
    /// Only items in this category (defaults to the defaultCategory preference)
    #[arg(long, short = 'c')]
    category: Option<String>,

    /// Show all categories even when a default category is set
    #[arg(long, conflicts_with = "category")]
    all: bool,

    /// Only featured items
    #[arg(long)]
    featured: bool,

    /// Top 10 items by visit count
    #[arg(long, conflicts_with_all = ["featured", "page"])]
    popular: bool,

    /// Only items carrying this tag (repeatable)
    #[arg(long = "tag", short = 't')]
    tags: Vec<String>,

    /// Minimum rating (0-5)
    #[arg(long)]
    min_rating: Option<f64>,

    /// Case-insensitive substring filter on title, description and tags
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    page: usize,

    /// Items per page (defaults to the itemsPerPage preference)
    #[arg(long)]
    page_size: Option<usize>,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    page: usize,
    page_size: usize,
    total_pages: usize,
    total: usize,
    count: usize,
    items: Vec<&'a Navigation>,
}

/// Reorder for the sortBy preference; `Default` keeps file order
fn sort_items(items: &mut [Navigation], sort: ListSort) {
    match sort {
        ListSort::Default => {}
        ListSort::Title => items.sort_by_key(|n| n.title.to_lowercase()),
        ListSort::Time => items.sort_by_key(|n| {
            std::cmp::Reverse(parse_timestamp(&n.update_time).map_or(0, |t| t.timestamp_millis()))
        }),
        ListSort::Popularity => items.sort_by_key(|n| std::cmp::Reverse(n.visit_count)),
        ListSort::Rating => items.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }
}

pub async fn run(args: ListArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let mut dataset = project.load_dataset();
    warn_load_errors(&dataset, output);

    let store = project.open_store()?;
    let preferences = project
        .prefs(&store)
        .preferences()?
        .unwrap_or_default();

    let navigations = &mut dataset.navigations;
    if preferences.sort_by != ListSort::Default {
        let mut items = navigations.items().to_vec();
        sort_items(&mut items, preferences.sort_by);
        navigations.apply(NavigationCommand::Loaded(items));
    }

    let category = match (&args.category, args.all) {
        (Some(id), _) => Some(id.clone()),
        (None, false) if !preferences.default_category.is_empty() => {
            Some(preferences.default_category.clone())
        }
        _ => None,
    };
    navigations.apply(NavigationCommand::SetCategoryFilter(category));
    let filters = ListFilters {
        featured: args.featured,
        tags: args.tags.clone(),
        min_rating: args.min_rating,
    };
    navigations.apply(match args.query.clone() {
        None if filters == ListFilters::default() => NavigationCommand::ClearQuery,
        query => NavigationCommand::SetQuery {
            query: query.unwrap_or_default(),
            filters,
        },
    });
    navigations.apply(NavigationCommand::SetPageSize(
        args.page_size.unwrap_or(preferences.items_per_page),
    ));
    navigations.apply(NavigationCommand::SetPage(args.page));

    let (items, total) = if args.popular {
        let popular = navigations.popular();
        let total = popular.len();
        (popular, total)
    } else {
        (navigations.current_page(), navigations.filtered().len())
    };
    let total_pages = if args.popular { 1 } else { navigations.total_pages() };

    if output.json {
        let json_output = ListOutput {
            page: navigations.page(),
            page_size: navigations.page_size(),
            total_pages,
            total,
            count: items.len(),
            items,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    if items.is_empty() {
        println!("{} No items to show", "!".yellow());
        return Ok(());
    }

    for item in &items {
        let featured = if item.featured { " ★".yellow().to_string() } else { String::new() };
        println!(
            "{}{}  {}",
            item.title.bold(),
            featured,
            item.id.dimmed()
        );
        println!("   {}", item.url.blue());
        if !item.description.is_empty() && output.verbose {
            println!("   {}", truncate(&item.description, 100));
        }
    }
    if args.popular {
        println!("\n{} most visited", items.len());
    } else {
        println!(
            "\nPage {}/{} ({} items)",
            navigations.page(),
            total_pages.max(1),
            total
        );
    }

    Ok(())
}
