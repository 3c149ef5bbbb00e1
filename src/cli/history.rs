use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::search::{HistoryEntry, PerformanceReport, SearchAnalytics, SearchSession};

#[derive(Args)]
pub struct HistoryArgs {
    /// Forget every recorded search
    #[arg(long, conflicts_with_all = ["remove", "analytics"])]
    clear: bool,

    /// Forget all searches for this keyword
    #[arg(long, value_name = "KEYWORD")]
    remove: Option<String>,

    /// Show keyword analytics and search performance
    #[arg(long)]
    analytics: bool,

    /// Number of entries to show
    #[arg(long, short = 'n', default_value = "20")]
    limit: usize,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    total: usize,
    entries: &'a [HistoryEntry],
    hot_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analytics: Option<SearchAnalytics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    performance: Option<PerformanceReport>,
}

#[derive(Serialize)]
struct HistoryChange<'a> {
    action: &'a str,
    removed: usize,
    remaining: usize,
}

pub async fn run(args: HistoryArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let history = prefs.search_history()?;
    let before = history.len();

    let mut session = SearchSession::from_config(&project.config.search).with_history(history);

    if args.clear {
        session.clear_history();
        prefs.set_search_history(session.history())?;
        return print_change("clear", before, 0, output);
    }

    if let Some(keyword) = &args.remove {
        if session.remove_from_history(keyword) {
            prefs.set_search_history(session.history())?;
        }
        let remaining = session.history().len();
        return print_change("remove", before - remaining, remaining, output);
    }

    let now = Utc::now();
    let entries = session.history();
    let shown = &entries[..entries.len().min(args.limit)];
    let hot_keywords = session.hot_keywords(now);
    let analytics = args.analytics.then(|| session.analytics());
    let performance = args.analytics.then(|| session.performance());

    if output.json {
        let json_output = HistoryOutput {
            total: entries.len(),
            entries: shown,
            hot_keywords,
            analytics,
            performance,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    if entries.is_empty() {
        println!("{} No searches recorded", "!".yellow());
        return Ok(());
    }

    println!("{} {} searches recorded", "✓".green(), entries.len());
    for entry in shown {
        let when = DateTime::<Utc>::from_timestamp_millis(entry.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {}  {}  {}",
            when.dimmed(),
            entry.keyword.bold(),
            format!("({} results)", entry.result_count).cyan()
        );
    }
    if !hot_keywords.is_empty() {
        println!("\n  Hot this week: {}", hot_keywords.join(", "));
    }

    if let Some(analytics) = &analytics {
        println!("\n{}", "Analytics".bold());
        println!("  Unique keywords: {}", analytics.unique_keywords);
        println!("  Average results: {:.1}", analytics.average_results);
        for top in analytics.top_keywords.iter().take(10) {
            println!("  {:<24} {}", top.keyword, top.count.to_string().cyan());
        }
        if !analytics.no_result_keywords.is_empty() {
            println!(
                "  {} No results for: {}",
                "!".yellow(),
                analytics.no_result_keywords.join(", ")
            );
        }
    }
    if let Some(performance) = &performance {
        println!("\n{}", "Performance".bold());
        println!(
            "  Average time: {:.1}ms, efficiency {:.0}%",
            performance.average_search_time_ms,
            performance.efficiency * 100.0
        );
        for slow in &performance.slow_queries {
            println!(
                "  {} slow: {} ({}ms)",
                "!".yellow(),
                slow.keyword,
                slow.search_time_ms
            );
        }
    }

    Ok(())
}

fn print_change(action: &str, removed: usize, remaining: usize, output: OutputConfig) -> Result<()> {
    if output.json {
        let json_output = HistoryChange {
            action,
            removed,
            remaining,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        println!("{} Removed {} history entries", "✓".green(), removed);
    }
    Ok(())
}
