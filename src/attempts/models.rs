//! Data models for the attempt log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded answer to a card. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: i64,
    /// Not checked against the current card set.
    pub card_id: String,
    pub timestamp: DateTime<Utc>,
    pub correct: bool,
}

/// Aggregated attempts for a single card id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAttemptSummary {
    pub card_id: String,
    pub total: i64,
    pub correct: i64,
    pub last_attempt: DateTime<Utc>,
}

impl CardAttemptSummary {
    /// Share of correct answers, 0.0 to 1.0
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}
