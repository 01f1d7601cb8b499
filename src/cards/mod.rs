//! Vocabulary cards for Sheetcards
//!
//! This module provides:
//! - Card model and card sets
//! - Spreadsheet CSV export fetching and parsing
//! - Single-slot card cache with explicit invalidation

pub mod cache;
pub mod models;
pub mod source;

pub use cache::{choose_random, CardCache};
pub use models::*;
pub use source::{CardSource, CardSourceError, Locator, SheetSource};
