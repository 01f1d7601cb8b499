//! Attempt log for Sheetcards
//!
//! Records whether each card was answered correctly, for later review.

pub mod models;
pub mod storage;

pub use models::*;
pub use storage::{AttemptStorage, AttemptStorageError};
