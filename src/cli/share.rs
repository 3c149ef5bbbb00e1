use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputConfig, Project};
use crate::types::Navigation;
use crate::user::UserProfile;

#[derive(Args)]
pub struct ShareArgs {
    /// Navigation item id
    id: String,

    /// Where the link is being shared, e.g. "wechat"
    #[arg(long)]
    platform: Option<String>,

    /// Project directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct ShareOutput<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<&'a str>,
    text: String,
}

/// Title, description and link, one per line
fn share_text(item: &Navigation) -> String {
    if item.description.is_empty() {
        format!("{}\n{}", item.title, item.url)
    } else {
        format!("{}\n{}\n{}", item.title, item.description, item.url)
    }
}

pub async fn run(args: ShareArgs, output: OutputConfig) -> Result<()> {
    let project = Project::find(&args.path)?;
    let dataset = project.load_dataset();
    let Some(item) = dataset.navigations.get(&args.id) else {
        bail!("Navigation item not found: {}", args.id);
    };

    let store = project.open_store()?;
    let prefs = project.prefs(&store);
    let mut profile = UserProfile::load(&prefs, &project.config.user)?;
    profile.record_share(&item.id, args.platform.as_deref());
    profile.save(&prefs)?;

    let text = share_text(item);
    if output.json {
        let json_output = ShareOutput {
            id: &item.id,
            platform: args.platform.as_deref(),
            text,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if output.quiet {
        println!("{text}");
    } else {
        println!("{text}");
        eprintln!("{} Share recorded", "✓".green());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_text_skips_empty_description() {
        let mut item: Navigation = serde_json::from_value(serde_json::json!({
            "id": "nav_1",
            "title": "ChatGPT",
            "url": "https://chat.openai.com",
            "categoryId": "cat_1"
        }))
        .unwrap();
        assert_eq!(share_text(&item), "ChatGPT\nhttps://chat.openai.com");

        item.description = "Chat assistant".into();
        assert_eq!(
            share_text(&item),
            "ChatGPT\nChat assistant\nhttps://chat.openai.com"
        );
    }
}
