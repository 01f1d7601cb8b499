use anyhow::{Context, Result};

use sheetcards_lib::cards::CardSource;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let source = app.sheet_source()?;
    let cards = source
        .fetch_cards()
        .await
        .context("Spreadsheet check failed")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("Spreadsheet has no usable rows.");
                return Ok(());
            }

            let id_width = cards.iter().map(|c| c.id.chars().count()).max().unwrap_or(2).max(2);
            let german_width = cards
                .iter()
                .map(|c| c.german.chars().count())
                .max()
                .unwrap_or(6)
                .max(6);

            println!(
                "{:<id_width$} {:<german_width$} Translation",
                "Id",
                "German",
                id_width = id_width,
                german_width = german_width
            );
            println!(
                "{} {} {}",
                "\u{2500}".repeat(id_width),
                "\u{2500}".repeat(german_width),
                "\u{2500}".repeat(11)
            );

            for card in &cards {
                println!(
                    "{:<id_width$} {:<german_width$} {}",
                    card.id,
                    card.german,
                    card.translation,
                    id_width = id_width,
                    german_width = german_width
                );
            }

            println!("\n{} cards parsed", cards.len());
        }
    }

    Ok(())
}
