mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sheetcards-cli", about = "Sheetcards maintenance commands", version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment file (default: .env in the working directory or a parent)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Attempt database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the spreadsheet once and print the parsed cards
    Check {
        /// Spreadsheet share link (default: GOOGLE_SHEET_URL)
        #[arg(long)]
        sheet_url: Option<String>,
    },

    /// Show recorded attempts
    Stats {
        /// Only show recent attempts for this card id
        #[arg(long)]
        card: Option<String>,
        /// Maximum attempts listed with --card
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    sheetcards_lib::config::load_env_file(cli.env_file.as_deref());
    let mut app = app::App::new(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        app.config.database_path = db;
    }

    match cli.command {
        Command::Check { sheet_url } => {
            if sheet_url.is_some() {
                app.config.sheet_url = sheet_url;
            }
            commands::check::run(&app, &cli.format).await?;
        }
        Command::Stats { card, limit } => {
            commands::stats::run(&app, card.as_deref(), limit, &cli.format)?;
        }
    }

    Ok(())
}
