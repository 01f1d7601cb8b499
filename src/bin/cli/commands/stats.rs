use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, card_id: Option<&str>, limit: usize, format: &OutputFormat) -> Result<()> {
    let storage = app.attempt_storage()?;

    match card_id {
        Some(card_id) => {
            let attempts = storage.list_attempts(Some(card_id), limit)?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&attempts)?);
                }
                OutputFormat::Plain => {
                    if attempts.is_empty() {
                        println!("No attempts recorded for card {}.", card_id);
                        return Ok(());
                    }

                    for attempt in &attempts {
                        let mark = if attempt.correct { "correct" } else { "wrong" };
                        println!(
                            "{}  {}",
                            attempt.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            mark
                        );
                    }
                }
            }
        }
        None => {
            let summary = storage.summary_by_card()?;

            match format {
                OutputFormat::Json => {
                    let output: Vec<serde_json::Value> = summary
                        .iter()
                        .map(|s| {
                            serde_json::json!({
                                "card_id": s.card_id,
                                "total": s.total,
                                "correct": s.correct,
                                "accuracy": s.accuracy(),
                                "last_attempt": s.last_attempt,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Plain => {
                    if summary.is_empty() {
                        println!("No attempts recorded.");
                        return Ok(());
                    }

                    let width = summary.iter().map(|s| s.card_id.len()).max().unwrap_or(4).max(4);

                    println!("{:<width$} Total Correct  Accuracy Last attempt", "Card", width = width);
                    for s in &summary {
                        println!(
                            "{:<width$} {:>5} {:>7} {:>8.0}% {}",
                            s.card_id,
                            s.total,
                            s.correct,
                            s.accuracy() * 100.0,
                            s.last_attempt.format("%Y-%m-%d %H:%M"),
                            width = width
                        );
                    }

                    let total: i64 = summary.iter().map(|s| s.total).sum();
                    println!("\n{} attempts across {} cards", total, summary.len());
                }
            }
        }
    }

    Ok(())
}
