use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use sheetcards_lib::config::{self, Config};

#[derive(Parser)]
#[command(name = "sheetcards", about = "Serve random vocabulary cards from a Google spreadsheet", version)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Environment file (default: .env in the working directory or a parent)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Address to bind (overrides config and SHEETCARDS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,

    /// SQLite file for the attempt log
    #[arg(long)]
    db: Option<PathBuf>,

    /// Directory served under /static
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Spreadsheet share link (default: read GOOGLE_SHEET_URL on every fetch)
    #[arg(long)]
    sheet_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    config::load_env_file(args.env_file.as_deref());
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = dir;
    }
    if args.sheet_url.is_some() {
        config.sheet_url = args.sheet_url;
    }

    sheetcards_lib::run(config).await
}
