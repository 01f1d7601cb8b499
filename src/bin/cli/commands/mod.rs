pub mod check;
pub mod stats;
