//! Fetching and parsing cards from a public Google spreadsheet.
//!
//! The sheet is read through its CSV export endpoint. The first row is always
//! treated as a header and discarded; every following row needs at least three
//! non-blank columns (`id`, `german`, `translation`) or it is skipped.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use csv::StringRecord;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use super::models::Card;
use crate::config::Config;

/// Export endpoint used when the configuration does not override it.
pub const DEFAULT_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";

/// Path segment that precedes the document id in a share link.
const DOCUMENT_SEGMENT: &str = "/d/";

#[derive(Error, Debug)]
pub enum CardSourceError {
    #[error("{0} is not set")]
    MissingLocator(String),

    #[error("Invalid Google Sheets URL format: {0}")]
    InvalidLocator(String),

    #[error("Failed to fetch Google Sheet data: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch Google Sheet data: server returned {0}")]
    Status(StatusCode),

    #[error("Spreadsheet export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to parse spreadsheet export: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet must have at least a header row and one data row")]
    TooFewRows,
}

pub type Result<T> = std::result::Result<T, CardSourceError>;

/// Anything that can produce a fresh, complete card set.
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn fetch_cards(&self) -> Result<Vec<Card>>;
}

/// Where the spreadsheet share link comes from.
#[derive(Debug, Clone)]
pub enum Locator {
    /// Read from this environment variable on every fetch.
    Env(String),
    /// A link fixed at construction time.
    Fixed(String),
}

impl Locator {
    /// Resolve the share link, failing when it is unset or blank.
    pub fn resolve(&self) -> Result<String> {
        let (value, name) = match self {
            Locator::Env(key) => (
                env::var(key).unwrap_or_default(),
                format!("{} environment variable", key),
            ),
            Locator::Fixed(url) => (url.clone(), "Spreadsheet URL".to_string()),
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(CardSourceError::MissingLocator(name));
        }
        Ok(value.to_string())
    }
}

/// Pull the document id out of a share link such as
/// `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`.
pub fn extract_document_id(locator: &str) -> Result<&str> {
    let start = locator
        .find(DOCUMENT_SEGMENT)
        .map(|pos| pos + DOCUMENT_SEGMENT.len())
        .ok_or_else(|| CardSourceError::InvalidLocator(locator.to_string()))?;

    let rest = &locator[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let document_id = &rest[..end];

    if document_id.is_empty() {
        return Err(CardSourceError::InvalidLocator(locator.to_string()));
    }
    Ok(document_id)
}

/// Build the CSV export URL for a document.
pub fn export_url(export_base: &str, document_id: &str) -> String {
    format!(
        "{}/{}/export?format=csv",
        export_base.trim_end_matches('/'),
        document_id
    )
}

/// Parse CSV export text into cards, preserving row order.
pub fn parse_cards(text: &str) -> Result<Vec<Card>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<StringRecord>, csv::Error>>()?;

    let row_count = line_rows(text, &rows);
    if row_count < 2 {
        return Err(CardSourceError::TooFewRows);
    }

    let cards: Vec<Card> = rows.iter().skip(1).filter_map(card_from_record).collect();

    let skipped = row_count - 1 - cards.len();
    if skipped > 0 {
        log::debug!("Skipped {} incomplete spreadsheet rows", skipped);
    }

    Ok(cards)
}

/// Number of rows counted line by line. The csv reader drops blank lines, but
/// a blank line is still an (empty) row; line breaks inside quoted fields are not.
fn line_rows(text: &str, records: &[StringRecord]) -> usize {
    if text.is_empty() {
        return 0;
    }
    let lines = line_breaks(text) + usize::from(!text.ends_with(['\n', '\r']));
    let embedded: usize = records
        .iter()
        .flat_map(|record| record.iter())
        .map(line_breaks)
        .sum();
    lines.saturating_sub(embedded).max(records.len())
}

/// `\n`, `\r\n` and a lone `\r` each count once.
fn line_breaks(text: &str) -> usize {
    text.matches('\n').count() + text.matches('\r').count() - text.matches("\r\n").count()
}

fn card_from_record(record: &StringRecord) -> Option<Card> {
    if record.len() < 3 {
        return None;
    }
    Card::from_cells(&record[0], &record[1], &record[2])
}

/// Card source backed by a Google spreadsheet's CSV export.
pub struct SheetSource {
    client: Client,
    locator: Locator,
    export_base: String,
}

impl SheetSource {
    /// Create a source with a bounded request timeout.
    pub fn new(locator: Locator, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .build()?;

        Ok(Self {
            client,
            locator,
            export_base: DEFAULT_EXPORT_BASE.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let locator = match &config.sheet_url {
            Some(url) => Locator::Fixed(url.clone()),
            None => Locator::Env(config.sheet_url_env.clone()),
        };

        Ok(Self::new(locator, config.fetch_timeout())?.with_export_base(&config.export_base_url))
    }

    /// Point the source at a different export host.
    pub fn with_export_base(mut self, export_base: impl Into<String>) -> Self {
        self.export_base = export_base.into();
        self
    }
}

#[async_trait]
impl CardSource for SheetSource {
    async fn fetch_cards(&self) -> Result<Vec<Card>> {
        let locator = self.locator.resolve()?;
        let document_id = extract_document_id(&locator)?;
        let url = export_url(&self.export_base, document_id);

        log::debug!("Fetching spreadsheet export from {}", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CardSourceError::Status(status));
        }

        // Always UTF-8, whatever charset the export claims.
        let bytes = response.bytes().await?;
        let text = String::from_utf8(bytes.to_vec())?;

        let cards = parse_cards(&text)?;
        log::info!("Fetched {} cards from spreadsheet {}", cards.len(), document_id);
        Ok(cards)
    }
}
