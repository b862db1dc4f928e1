//! Item CLI commands: add, recent, show.

use std::path::Path;

use anyhow::{Result, anyhow};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use echolocator_core::service::gateway::Listing;
use echolocator_types::item::{ImageContentType, ItemId, ItemSubmission, ItemView};

use crate::state::AppState;

/// Metadata given on the command line for `echoloc add`.
pub struct AddArgs {
    pub title: String,
    pub location: String,
    pub description: Option<String>,
    pub contact: Option<String>,
}

/// Index an image file.
///
/// # Examples
///
/// ```bash
/// echoloc add ./wallet.jpg --title "Black Wallet" --location Library
/// ```
pub async fn add_item(state: &AppState, image: &Path, args: AddArgs, json: bool) -> Result<()> {
    let content_type = content_type_for(image)?;
    let bytes = tokio::fs::read(image)
        .await
        .map_err(|e| anyhow!("cannot read {}: {e}", image.display()))?;

    let spinner = (!json).then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(spinner_style);
        }
        spinner.set_message("Embedding image...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let result = state
        .gateway
        .ingest(ItemSubmission {
            title: args.title,
            location: args.location,
            description: args.description,
            finder_contact: args.contact,
            content_type: content_type.mime().to_string(),
            image: bytes,
        })
        .await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let item = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!();
    println!("  {} Item stored successfully.", style("✓").green().bold());
    println!();
    print_item(&item);
    println!();
    Ok(())
}

/// List the newest items in a table.
pub async fn list_recent(state: &AppState, limit: Option<i64>, json: bool) -> Result<()> {
    let items = state.gateway.list(Listing::Recent, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!();
        println!(
            "  {} No items yet. Add one with: {}",
            style("i").blue().bold(),
            style("echoloc add <image> --title <title> --location <place>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Location").fg(Color::White),
        Cell::new("Found").fg(Color::White),
    ]);
    for item in &items {
        table.add_row(vec![
            Cell::new(item.id).fg(Color::DarkGrey),
            Cell::new(&item.title).fg(Color::Cyan),
            Cell::new(&item.location),
            Cell::new(format_relative_time(&item.created_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} item{}",
        style(items.len()).bold(),
        if items.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Show one item's full record.
pub async fn show_item(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id: ItemId = id.parse().map_err(|e: String| anyhow!(e))?;
    let item = state.gateway.get_item(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!();
    print_item(&item);
    println!();
    Ok(())
}

fn print_item(item: &ItemView) {
    println!("  {}  {}", style("ID:").bold(), style(item.id).dim());
    println!("  {}  {}", style("Title:").bold(), style(&item.title).cyan());
    println!("  {}  {}", style("Location:").bold(), &item.location);
    if let Some(description) = &item.description {
        println!("  {}  {}", style("Description:").bold(), description);
    }
    if let Some(contact) = &item.finder_contact {
        println!("  {}  {}", style("Contact:").bold(), contact);
    }
    println!("  {}  {}", style("Image:").bold(), style(&item.image_url).dim());
    println!(
        "  {}  {}",
        style("Found:").bold(),
        item.created_at.format("%Y-%m-%d %H:%M UTC")
    );
}

/// Content type from the file extension.
fn content_type_for(path: &Path) -> Result<ImageContentType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageContentType::from_extension)
        .ok_or_else(|| anyhow!("Upload JPG, PNG, or WEBP images only."))
}

pub(crate) fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_content_type_for() {
        assert_eq!(
            content_type_for(Path::new("a/b/keys.JPEG")).unwrap(),
            ImageContentType::Jpeg
        );
        assert_eq!(
            content_type_for(Path::new("photo.png")).unwrap(),
            ImageContentType::Png
        );
        assert!(content_type_for(Path::new("scan.gif")).is_err());
        assert!(content_type_for(Path::new("noext")).is_err());
    }

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(3))), "3h ago");
        assert_eq!(format_relative_time(&(now - Duration::days(2))), "2d ago");
    }
}
