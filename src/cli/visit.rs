use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::store::{NavigationCommand, NavigationEvent};
use crate::user::UserProfile;

#[derive(Args)]
pub struct VisitArgs {
    /// Navigation item id
    id: String,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct VisitOutput<'a> {
    id: &'a str,
    title: &'a str,
    url: &'a str,
    visit_count: u64,
    total_visits: u64,
}

pub async fn run(args: VisitArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let mut dataset = project.load_dataset();

    let visit_count = match dataset
        .navigations
        .apply(NavigationCommand::IncrementVisit(args.id.clone()))
    {
        NavigationEvent::VisitCounted { visit_count, .. } => visit_count,
        _ => bail!("Navigation item not found: {}", args.id),
    };
    let Some(item) = dataset.navigations.get(&args.id) else {
        bail!("Navigation item not found: {}", args.id);
    };

    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let mut profile = UserProfile::load(&prefs, &project.config.user)?;
    profile.add_recent_visit(item);
    profile.save(&prefs)?;

    if output.json {
        let json_output = VisitOutput {
            id: &item.id,
            title: &item.title,
            url: &item.url,
            visit_count,
            total_visits: profile.stats.total_visits,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        println!("{} Visited {}", "✓".green(), item.title.bold());
        println!("  {}", item.url.blue());
        if output.verbose {
            println!(
                "  {} visits to this item, {} visits in total",
                visit_count, profile.stats.total_visits
            );
        }
    }

    Ok(())
}
