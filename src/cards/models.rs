//! Data models for vocabulary cards

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single vocabulary card parsed from one spreadsheet row.
///
/// `id` comes straight from the first column and is not guaranteed to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub german: String,
    pub translation: String,
}

impl Card {
    /// Build a card from raw cells, trimming each one.
    ///
    /// Returns `None` when any of the three cells is empty after trimming.
    pub fn from_cells(id: &str, german: &str, translation: &str) -> Option<Self> {
        let (id, german, translation) = (id.trim(), german.trim(), translation.trim());
        if id.is_empty() || german.is_empty() || translation.is_empty() {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            german: german.to_string(),
            translation: translation.to_string(),
        })
    }
}

/// An immutable, complete set of cards in spreadsheet row order.
pub type CardSet = Arc<Vec<Card>>;
