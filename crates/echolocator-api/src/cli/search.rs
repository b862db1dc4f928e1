//! `echoloc search`: rank items against a text description.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use echolocator_core::service::gateway::SearchRequest;

use crate::state::AppState;

pub async fn search(state: &AppState, request: SearchRequest, json: bool) -> Result<()> {
    let results = state.gateway.search_text(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!();
    if results.results.is_empty() {
        println!(
            "  {} Nothing matched '{}' at similarity {:.2} or above.",
            style("i").blue().bold(),
            style(&results.query).cyan(),
            results.threshold
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Match").fg(Color::White),
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Location").fg(Color::White),
        Cell::new("Contact").fg(Color::White),
    ]);
    for hit in &results.results {
        table.add_row(vec![
            Cell::new(format!("{:.1}%", hit.similarity * 100.0)).fg(match_color(hit.similarity)),
            Cell::new(hit.item.id).fg(Color::DarkGrey),
            Cell::new(&hit.item.title).fg(Color::Cyan),
            Cell::new(&hit.item.location),
            Cell::new(hit.item.finder_contact.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "  {} match{} for '{}' (threshold {:.2})",
        style(results.count).bold(),
        if results.count == 1 { "" } else { "es" },
        results.query,
        results.threshold
    );
    println!();
    Ok(())
}

fn match_color(similarity: f64) -> Color {
    if similarity >= 0.85 {
        Color::Green
    } else if similarity >= 0.7 {
        Color::Yellow
    } else {
        Color::DarkGrey
    }
}
