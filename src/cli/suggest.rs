use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{warn_load_errors, OutputConfig, Project};
use crate::search::{generate_suggestions, SearchSession, Suggestion};

#[derive(Args)]
pub struct SuggestArgs {
    /// Partially typed keyword; when omitted, show recent and hot searches
    #[arg(default_value = "")]
    query: String,

    /// Maximum number of suggestions (defaults to [search] suggestion_limit)
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Complete from search history, hot searches, categories and popular tags instead
    #[arg(long)]
    quick: bool,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct SuggestOutput<'a> {
    query: &'a str,
    count: usize,
    suggestions: &'a [Suggestion],
}

#[derive(Serialize)]
struct StarterOutput<'a> {
    recent: Vec<&'a str>,
    hot: &'a [String],
}

pub async fn run(args: SuggestArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let dataset = project.load_dataset();
    warn_load_errors(&dataset, output);

    let limit = args.limit.unwrap_or(project.config.search.suggestion_limit);
    let categories = dataset.categories.flat_list();
    let items = dataset.navigations.items();

    if args.query.trim().is_empty() || args.quick {
        let store = project.open_store()?;
        let prefs = project.prefs(&store);
        let session = SearchSession::from_config(&project.config.search)
            .with_history(prefs.search_history()?);
        if args.query.trim().is_empty() {
            return print_starters(&session, output);
        }
        let mut suggestions = session.quick_suggestions(&args.query, items, &categories);
        suggestions.truncate(limit);
        return print_suggestions(&args.query, &suggestions, output);
    }

    let suggestions = generate_suggestions(items, &categories, &args.query, limit);
    print_suggestions(&args.query, &suggestions, output)
}

/// What to offer before anything is typed
fn print_starters(session: &SearchSession, output: OutputConfig) -> Result<()> {
    let recent = session.recent_searches();
    let hot = session.hot_searches();
    if output.json {
        let json_output = StarterOutput { recent, hot };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        if !recent.is_empty() {
            println!("{}", "Recent searches".bold());
            for keyword in &recent {
                println!("  {keyword}");
            }
        }
        println!("{}", "Hot searches".bold());
        for keyword in hot {
            println!("  {keyword}");
        }
    }
    Ok(())
}

fn print_suggestions(query: &str, suggestions: &[Suggestion], output: OutputConfig) -> Result<()> {
    if output.json {
        let json_output = SuggestOutput {
            query,
            count: suggestions.len(),
            suggestions,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        if suggestions.is_empty() {
            println!("{} No suggestions for: {}", "!".yellow(), query.cyan());
            return Ok(());
        }
        for suggestion in suggestions {
            if output.verbose {
                println!(
                    "{}  {} {}",
                    suggestion.text,
                    suggestion.kind.to_string().dimmed(),
                    format!("(score {:.1}, seen {})", suggestion.score, suggestion.count).dimmed()
                );
            } else {
                println!("{}  {}", suggestion.text, suggestion.kind.to_string().dimmed());
            }
        }
    }

    Ok(())
}
