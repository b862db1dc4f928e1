//! Corpus statistics and maintenance commands.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::item::format_relative_time;
use crate::state::AppState;

/// Display the stats dashboard.
pub async fn stats(state: &AppState, json: bool) -> Result<()> {
    let stats = state.gateway.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} v{}",
        style("⚡").bold(),
        style(&state.config.api_title).bold(),
        state.config.api_version
    );
    println!();
    println!("  {}  {}", style("Items:").bold(), stats.total_items);
    println!("  {}  {}", style("Locations:").bold(), stats.unique_locations);
    println!(
        "  {}  {}",
        style("Last 7 days:").bold(),
        stats.items_last_7_days
    );
    println!(
        "  {}  {}",
        style("Last upload:").bold(),
        stats
            .last_uploaded_at
            .as_ref()
            .map(format_relative_time)
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "  {}  {}",
        style("Data dir:").bold(),
        style(state.data_dir.display()).dim()
    );

    if !stats.top_locations.is_empty() {
        println!();
        println!("  {}", style("Top locations").bold());
        for entry in &stats.top_locations {
            println!(
                "    {} {} {}",
                style("•").dim(),
                entry.location,
                style(format!("({})", entry.count)).dim()
            );
        }
    }
    println!();
    Ok(())
}

/// Remove unreferenced images from the upload directory.
pub async fn reconcile(state: &AppState, json: bool) -> Result<()> {
    let spinner = (!json).then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(spinner_style);
        }
        spinner.set_message("Scanning stored images...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let result = state.gateway.reconcile_assets().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let removed = result?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
        return Ok(());
    }

    println!();
    println!(
        "  {} Removed {} orphaned image{} from {}",
        style("✓").green().bold(),
        style(removed).bold(),
        if removed == 1 { "" } else { "s" },
        style(state.upload_dir.display()).dim()
    );
    println!();
    Ok(())
}
