use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{truncate, warn_load_errors, OutputConfig, Project};
use crate::search::{
    SearchFilters, SearchOptions, SearchResult, SearchSession, SearchStats, SortBy,
};
use crate::types::parse_timestamp;
use crate::user::UserProfile;

#[derive(Args)]
pub struct SearchArgs {
    /// The search keyword
    #[arg(required_unless_present = "refine")]
    query: Option<String>,

    /// Re-run the last search, applying the given filters on top of its own
    #[arg(long, conflicts_with = "query")]
    refine: bool,

    /// Drop the last search's filters before refining
    #[arg(long, requires = "refine")]
    reset_filters: bool,

    /// Only items in this category (repeatable)
    #[arg(long = "category", short = 'c')]
    categories: Vec<String>,

    /// Only items carrying this tag (repeatable)
    #[arg(long = "tag", short = 't')]
    tags: Vec<String>,

    /// Minimum rating (0-5)
    #[arg(long)]
    rating: Option<f64>,

    /// Only featured items
    #[arg(long)]
    featured: bool,

    /// Created on or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    from: Option<String>,

    /// Created on or before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    to: Option<String>,

    /// Result ordering
    #[arg(long, short = 's', value_enum, default_value_t = SortBy::Relevance)]
    sort: SortBy,

    /// Maximum number of results (defaults to [search] default_limit)
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Number of results to skip
    #[arg(long, default_value = "0")]
    offset: usize,

    /// Show category, tag and rating distributions
    #[arg(long)]
    stats: bool,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    sort: SortBy,
    total: usize,
    offset: usize,
    count: usize,
    results: &'a [SearchResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a SearchStats>,
}

/// `--to 2024-03-01` includes the whole day
fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if end_of_day {
        if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc() + Duration::days(1) - Duration::milliseconds(1));
            }
        }
    }
    parse_timestamp(value).with_context(|| format!("Invalid date: {value}"))
}

/// Open ends stay within four-digit years so saved filters read back
const EARLIEST: i64 = -62_135_596_800;
const LATEST: i64 = 253_402_300_799;

fn open_bound(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

fn date_range(args: &SearchArgs) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    Ok(match (&args.from, &args.to) {
        (None, None) => None,
        (from, to) => {
            let start = match from {
                Some(v) => parse_bound(v, false)?,
                None => open_bound(EARLIEST),
            };
            let end = match to {
                Some(v) => parse_bound(v, true)?,
                None => open_bound(LATEST),
            };
            Some((start, end))
        }
    })
}

fn build_filters(args: &SearchArgs) -> Result<SearchFilters> {
    Ok(SearchFilters {
        categories: args.categories.clone(),
        tags: args.tags.clone(),
        rating: args.rating.unwrap_or(0.0),
        featured: args.featured.then_some(true),
        date_range: date_range(args)?,
    })
}

/// Flags given on the command line replace the matching saved filter
fn merge_filters(base: &SearchFilters, args: &SearchArgs) -> Result<SearchFilters> {
    let mut filters = base.clone();
    if !args.categories.is_empty() {
        filters.categories = args.categories.clone();
    }
    if !args.tags.is_empty() {
        filters.tags = args.tags.clone();
    }
    if let Some(rating) = args.rating {
        filters.rating = rating;
    }
    if args.featured {
        filters.featured = Some(true);
    }
    if let Some(range) = date_range(args)? {
        filters.date_range = Some(range);
    }
    Ok(filters)
}

pub async fn run(args: SearchArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let dataset = project.load_dataset();
    warn_load_errors(&dataset, output);

    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let mut session = SearchSession::from_config(&project.config.search)
        .with_history(prefs.search_history()?);

    let categories = dataset.categories.flat_list();
    let limit = Some(args.limit.unwrap_or(project.config.search.default_limit));
    if args.refine {
        let Some(last) = session.history().first().map(|h| h.keyword.clone()) else {
            bail!("No previous search to refine");
        };
        session.resume(SearchOptions {
            keyword: last,
            filters: prefs.search_filters()?.unwrap_or_default(),
            sort_by: args.sort,
            limit,
            offset: args.offset,
        });
        if args.reset_filters {
            session.reset_filters();
        }
        let filters = merge_filters(session.filters(), &args)?;
        tracing::debug!(keyword = session.keyword(), ?filters, "Refining last search");
        session.update_filters(filters, dataset.navigations.items(), &categories);
    } else {
        let options = SearchOptions {
            keyword: args.query.clone().unwrap_or_default(),
            filters: build_filters(&args)?,
            sort_by: args.sort,
            limit,
            offset: args.offset,
        };
        session.search(dataset.navigations.items(), &categories, options);
    }

    if !session.keyword().is_empty() {
        prefs.set_search_filters(session.filters())?;
        prefs.set_search_history(session.history())?;
        let mut profile = UserProfile::load(&prefs, &project.config.user)?;
        profile.record_search(session.keyword(), session.stats().total_results);
        profile.save(&prefs)?;
    }

    let query = session.keyword();
    let results = session.results();
    let stats = session.stats();

    if output.json {
        let json_output = SearchOutput {
            query,
            sort: args.sort,
            total: stats.total_results,
            offset: args.offset,
            count: results.len(),
            results,
            stats: args.stats.then_some(stats),
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    if results.is_empty() {
        println!("{} No results found for: {}", "!".yellow(), query.cyan());
        let suggestions = session.suggestions();
        if !suggestions.is_empty() {
            let texts: Vec<&str> = suggestions.iter().take(5).map(|s| s.text.as_str()).collect();
            println!("  Did you mean: {}", texts.join(", ").cyan());
        }
        return Ok(());
    }

    println!(
        "{} Found {} results for: {} ({}, {}ms)",
        "✓".green(),
        stats.total_results,
        query.cyan(),
        args.sort.to_string().dimmed(),
        stats.search_time_ms
    );
    if results.len() < stats.total_results {
        println!(
            "  Showing {}-{}",
            args.offset + 1,
            args.offset + results.len()
        );
    }
    println!();

    for (i, result) in results.iter().enumerate() {
        let item = &result.item;
        let featured = if item.featured { " ★".yellow().to_string() } else { String::new() };
        println!(
            "{}. {}{} {}",
            args.offset + i + 1,
            item.title.bold(),
            featured,
            format!("(score: {:.2})", result.score).dimmed()
        );
        println!("   {}", item.url.blue());
        if !item.description.is_empty() {
            println!("   {}", truncate(&item.description, 100));
        }
        let category = result
            .category
            .as_ref()
            .map_or(item.category_id.as_str(), |c| c.name.as_str());
        let mut meta = format!("   {}", category.magenta());
        if !item.tags.is_empty() {
            meta.push_str(&format!("  #{}", item.tags.join(" #")));
        }
        if item.rating > 0.0 {
            meta.push_str(&format!("  {:.1}/5", item.rating));
        }
        meta.push_str(&format!("  {} visits", item.visit_count));
        println!("{meta}");
        if output.verbose {
            let fields: Vec<String> = result.matched_fields.iter().map(ToString::to_string).collect();
            println!("   {} {}", "matched:".dimmed(), fields.join(", "));
        }
        println!();
    }

    if args.stats {
        print_distribution("Categories", &stats.category_distribution);
        print_distribution("Tags", &stats.tag_distribution);
        print_distribution("Ratings", &stats.rating_distribution);
    }

    Ok(())
}

fn print_distribution(label: &str, counts: &std::collections::BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    let mut sorted: Vec<(&String, &usize)> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1));
    println!("{}:", label.bold());
    for (name, count) in sorted.into_iter().take(10) {
        println!("  {:<24} {}", name, count.to_string().cyan());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_bounds_are_inclusive_days() {
        let start = parse_bound("2024-03-01", false).unwrap();
        let end = parse_bound("2024-03-01", true).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1) - Duration::milliseconds(1));
        assert!(parse_bound("March", false).is_err());
    }

    #[derive(clap::Parser)]
    struct Cli {
        #[command(flatten)]
        args: SearchArgs,
    }

    fn parse(argv: &[&str]) -> SearchArgs {
        use clap::Parser;
        Cli::parse_from(std::iter::once("search").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_refine_flags_override_saved_filters() {
        let saved = SearchFilters {
            tags: vec!["image".into()],
            featured: Some(true),
            rating: 4.0,
            ..Default::default()
        };
        let merged = merge_filters(&saved, &parse(&["--refine", "--category", "cat_3"])).unwrap();
        assert_eq!(merged.categories, vec!["cat_3"]);
        assert_eq!(merged.tags, vec!["image"]);
        assert_eq!(merged.featured, Some(true));
        assert_eq!(merged.rating, 4.0);

        let unchanged = merge_filters(&saved, &parse(&["--refine"])).unwrap();
        assert_eq!(unchanged, saved);
    }

    #[test]
    fn test_open_date_range_survives_storage() {
        let filters = build_filters(&parse(&["chat", "--from", "2024-01-01"])).unwrap();
        let json = serde_json::to_string(&filters).unwrap();
        let back: SearchFilters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filters);
    }

    #[test]
    fn test_rfc3339_upper_bound_kept_exact() {
        let end = parse_bound("2024-03-01T12:00:00Z", true).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }
}
