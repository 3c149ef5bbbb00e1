use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::storage::{format_size, StorageUsage};
use crate::user::{
    DailyActivity, TodayStats, UserActivity, UserDataImport, UserProfile, UserStats,
    PREFERENCE_KEYS,
};

#[derive(Args)]
pub struct PrefsArgs {
    #[command(subcommand)]
    command: PrefsCommands,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".", global = true)]
    path: PathBuf,
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show one preference, or all of them
    Get { key: Option<String> },

    /// Change a preference
    Set { key: String, value: String },

    /// Write preferences, favorites and activity as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Dump the raw stored keys instead of the profile document
        #[arg(long)]
        raw: bool,
    },

    /// Load a previously exported document
    Import {
        file: PathBuf,

        /// The file is a raw key dump from `export --raw`
        #[arg(long)]
        raw: bool,
    },

    /// Restore defaults and forget favorites, visits and activity
    Reset,

    /// Usage statistics and recent activity
    Stats,

    /// Forget part of the profile
    Clear {
        #[arg(value_enum)]
        target: ClearTarget,
    },

    /// Drop expired entries and report storage usage
    Cleanup,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClearTarget {
    /// Recently visited items
    Visits,
    /// The activity log
    Activities,
    /// Visit and search counters
    Stats,
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    stats: &'a UserStats,
    today: TodayStats,
    weekly: Vec<DailyActivity>,
    recent_activities: Vec<&'a UserActivity>,
}

#[derive(Serialize)]
struct CleanupOutput {
    removed: usize,
    usage: StorageUsage,
}

pub async fn run(args: PrefsArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let mut profile = UserProfile::load(&prefs, &project.config.user)?;

    match args.command {
        PrefsCommands::Get { key } => {
            let values: BTreeMap<&str, String> = match key.as_deref() {
                Some(key) => {
                    let Some(value) = profile.preferences.get_field(key) else {
                        bail!(
                            "Unknown preference: {key} (expected one of: {})",
                            PREFERENCE_KEYS.join(", ")
                        );
                    };
                    BTreeMap::from([(key, value)])
                }
                None => PREFERENCE_KEYS
                    .iter()
                    .filter_map(|k| profile.preferences.get_field(k).map(|v| (*k, v)))
                    .collect(),
            };
            if output.json {
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else if !output.quiet {
                for (key, value) in &values {
                    let shown = if value.is_empty() {
                        "(none)".dimmed()
                    } else {
                        value.cyan()
                    };
                    println!("{:<16} {}", key, shown);
                }
            }
        }
        PrefsCommands::Set { key, value } => {
            profile.preferences.set_field(&key, &value)?;
            profile.save(&prefs)?;
            if output.json {
                let json_output = BTreeMap::from([(key.as_str(), value.as_str())]);
                println!("{}", serde_json::to_string_pretty(&json_output)?);
            } else if !output.quiet {
                println!("{} Set {} = {}", "✓".green(), key, value.cyan());
            }
        }
        PrefsCommands::Export { output: file, raw } => {
            let json = if raw {
                serde_json::to_string_pretty(&prefs.export()?)?
            } else {
                serde_json::to_string_pretty(&profile.export())?
            };
            match file {
                Some(file) => {
                    std::fs::write(&file, json)
                        .with_context(|| format!("Failed to write {}", file.display()))?;
                    if !output.quiet && !output.json {
                        println!("{} Exported to {}", "✓".green(), file.display());
                    }
                }
                None => println!("{json}"),
            }
        }
        PrefsCommands::Import { file, raw: true } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let data: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid key dump: {}", file.display()))?;
            let count = prefs.namespace().import(&data)?;
            if output.json {
                let json_output = BTreeMap::from([("imported", count)]);
                println!("{}", serde_json::to_string_pretty(&json_output)?);
            } else if !output.quiet {
                println!("{} Imported {} keys from {}", "✓".green(), count, file.display());
            }
        }
        PrefsCommands::Import { file, raw: false } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let data: UserDataImport = serde_json::from_str(&content)
                .with_context(|| format!("Invalid export document: {}", file.display()))?;
            profile.import(data);
            profile.save(&prefs)?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&profile.export())?);
            } else if !output.quiet {
                println!(
                    "{} Imported {} ({} favorites, {} activities)",
                    "✓".green(),
                    file.display(),
                    profile.favorites.len(),
                    profile.activities.len()
                );
            }
        }
        PrefsCommands::Reset => {
            let removed = prefs.clear()?;
            tracing::debug!(removed, "Cleared stored preference keys");
            profile.clear_all();
            profile.save(&prefs)?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&profile.export())?);
            } else if !output.quiet {
                println!("{} Preferences reset to defaults", "✓".green());
            }
        }
        PrefsCommands::Stats => print_stats(&profile, Utc::now(), output)?,
        PrefsCommands::Clear { target } => {
            let label = match target {
                ClearTarget::Visits => {
                    profile.clear_recent_visits();
                    "recent visits"
                }
                ClearTarget::Activities => {
                    profile.clear_activities();
                    "activities"
                }
                ClearTarget::Stats => {
                    profile.reset_stats();
                    "stats"
                }
            };
            profile.save(&prefs)?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&profile.export())?);
            } else if !output.quiet {
                println!("{} Cleared {}", "✓".green(), label);
            }
        }
        PrefsCommands::Cleanup => {
            let removed = prefs.cleanup()?;
            let usage = prefs.usage()?;
            if output.json {
                let json_output = CleanupOutput { removed, usage };
                println!("{}", serde_json::to_string_pretty(&json_output)?);
            } else if !output.quiet {
                println!("{} Removed {} expired entries", "✓".green(), removed);
                println!(
                    "  Storage: {} of {} ({}%)",
                    format_size(usage.used),
                    format_size(usage.total),
                    usage.percentage
                );
            }
        }
    }

    Ok(())
}

fn print_stats(profile: &UserProfile, now: DateTime<Utc>, output: OutputConfig) -> Result<()> {
    let json_output = StatsOutput {
        stats: &profile.stats,
        today: profile.today_stats(now),
        weekly: profile.weekly_stats(now),
        recent_activities: profile.recent_activities(),
    };
    if output.json {
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    let stats = json_output.stats;
    println!("{} Member since {}", "✓".green(), stats.join_date);
    println!("  Visits:     {}", stats.total_visits.to_string().cyan());
    println!("  Searches:   {}", stats.total_searches.to_string().cyan());
    println!("  Favorites:  {}", stats.favorite_count.to_string().cyan());

    let today = &json_output.today;
    println!(
        "  Today:      {} visits, {} searches, {} favorites, {} shares",
        today.visits, today.searches, today.favorites, today.shares
    );

    println!("\n  Last 7 days:");
    for day in &json_output.weekly {
        println!(
            "    {}  {:>3} visits  {:>3} searches",
            day.date.dimmed(),
            day.visits,
            day.searches
        );
    }

    if output.verbose && !json_output.recent_activities.is_empty() {
        println!("\n  Recent activity:");
        for activity in &json_output.recent_activities {
            let when = DateTime::<Utc>::from_timestamp_millis(activity.timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let kind = serde_json::to_value(activity.kind)?;
            println!(
                "    {}  {:<8} {}",
                when.dimmed(),
                kind.as_str().unwrap_or_default(),
                activity.target_title.as_deref().unwrap_or(&activity.target)
            );
        }
    }

    Ok(())
}
