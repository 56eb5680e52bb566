//! Fuel blend calculator
//!
//! Percentage-weighted octane and cost roll-up for a blend of materials,
//! with percentage-total classification and local storage of saved
//! calculations.

pub mod calculator;
pub mod db;
pub mod error;
pub mod input;
pub mod models;
pub mod sheet;

pub use calculator::{
    aggregate, classify_percentage_total, compute_contributions, filter_filled_entries,
};
pub use models::{AggregateResult, Contributions, MaterialEntry, PercentageCheck, PercentageStatus};
pub use sheet::BlendSheet;
