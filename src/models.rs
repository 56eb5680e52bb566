//! Data models for blend materials and calculation results

use chrono::NaiveDate;
use serde::Serialize;

/// One blending ingredient as entered by a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialEntry {
    pub identifier: String,
    pub name: String,
    pub octane_rating: f64,
    pub unit_price: f64, // currency per unit mass
    pub inclusion_percentage: f64,
}

impl MaterialEntry {
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        octane_rating: f64,
        unit_price: f64,
        inclusion_percentage: f64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            octane_rating,
            unit_price,
            inclusion_percentage,
        }
    }

    /// An entry counts toward the blend only when every field is present and positive
    pub fn is_filled(&self) -> bool {
        !self.name.is_empty()
            && self.octane_rating > 0.0
            && self.unit_price > 0.0
            && self.inclusion_percentage > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contributions {
    pub octane_contribution: f64,
    pub cost_contribution: f64,
}

/// Totals over the filled entries of a blend
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AggregateResult {
    pub total_percentage: f64,
    pub total_octane: f64,
    pub total_cost: f64,
    pub sale_price: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PercentageStatus {
    OverLimit,
    Complete,
    Partial,
    Low,
}

impl PercentageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PercentageStatus::OverLimit => "over-limit",
            PercentageStatus::Complete => "complete",
            PercentageStatus::Partial => "partial",
            PercentageStatus::Low => "low",
        }
    }
}

impl std::fmt::Display for PercentageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PercentageCheck {
    pub status: PercentageStatus,
    pub is_over_limit: bool,
}

/// A filled entry together with its derived values, as shown and saved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialLine {
    #[serde(flatten)]
    pub entry: MaterialEntry,
    #[serde(flatten)]
    pub contributions: Contributions,
}

/// Header row of a saved calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationRecord {
    pub id: i64,
    pub calculation_date: NaiveDate,
    pub totals: AggregateResult,
    pub notes: Option<String>,
    pub created_at: String,
}
