use std::path::Path;

use anyhow::{bail, Context, Result};

use sheetcards_lib::attempts::AttemptStorage;
use sheetcards_lib::cards::SheetSource;
use sheetcards_lib::config::Config;

/// Shared configuration for CLI commands
pub struct App {
    pub config: Config,
}

impl App {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path).context("Failed to load configuration")?;
        Ok(Self { config })
    }

    pub fn sheet_source(&self) -> Result<SheetSource> {
        SheetSource::from_config(&self.config).context("Failed to create spreadsheet client")
    }

    /// Open the attempt database. Refuses to create a new one.
    pub fn attempt_storage(&self) -> Result<AttemptStorage> {
        let path = &self.config.database_path;
        if !path.exists() {
            bail!("No attempt database at {}", path.display());
        }
        AttemptStorage::open(path)
            .with_context(|| format!("Failed to open attempt database {}", path.display()))
    }
}
