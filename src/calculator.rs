//! Blend aggregation logic
//!
//! Percentage-weighted octane and cost roll-up over the filled materials of a
//! blend. Every function here is pure and recomputes from its inputs.

use tracing::debug;

use crate::models::{
    AggregateResult, Contributions, MaterialEntry, MaterialLine, PercentageCheck, PercentageStatus,
};

/// Totals above this are over the limit and cannot be saved
pub const OVER_LIMIT_THRESHOLD: f64 = 100.01;
/// Lower edge of the band accepted as a complete 100% blend
pub const COMPLETE_THRESHOLD: f64 = 99.9;
/// Totals below this are flagged as low
pub const LOW_THRESHOLD: f64 = 50.0;

/// Missing or invalid numbers count as zero
fn or_zero(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value }
}

/// Keep only entries with a name and positive octane, price and percentage
pub fn filter_filled_entries(entries: &[MaterialEntry]) -> Vec<&MaterialEntry> {
    entries.iter().filter(|e| e.is_filled()).collect()
}

/// Octane and cost contributed by one entry at its inclusion percentage
///
/// Unfilled entries are not special-cased; callers filter first.
pub fn compute_contributions(entry: &MaterialEntry) -> Contributions {
    Contributions {
        octane_contribution: entry.octane_rating * entry.inclusion_percentage / 100.0,
        cost_contribution: entry.unit_price * entry.inclusion_percentage / 100.0,
    }
}

/// Aggregate the filled entries of a blend against a sale price
pub fn aggregate(entries: &[MaterialEntry], sale_price: f64) -> AggregateResult {
    let mut total_percentage = 0.0;
    let mut total_octane = 0.0;
    let mut total_cost = 0.0;

    let filled = filter_filled_entries(entries);
    for entry in &filled {
        let contributions = compute_contributions(entry);
        total_percentage += or_zero(entry.inclusion_percentage);
        total_octane += or_zero(contributions.octane_contribution);
        total_cost += or_zero(contributions.cost_contribution);
    }

    let sale_price = or_zero(sale_price);
    let result = AggregateResult {
        total_percentage,
        total_octane,
        total_cost,
        sale_price,
        profit: sale_price - total_cost,
    };

    debug!(
        entries = entries.len(),
        filled = filled.len(),
        total_percentage,
        total_octane,
        total_cost,
        "recomputed blend totals"
    );

    result
}

/// Classify a percentage total for feedback and save gating
pub fn classify_percentage_total(total_percentage: f64) -> PercentageCheck {
    let status = if total_percentage > OVER_LIMIT_THRESHOLD {
        PercentageStatus::OverLimit
    } else if total_percentage >= COMPLETE_THRESHOLD {
        PercentageStatus::Complete
    } else if total_percentage >= LOW_THRESHOLD {
        PercentageStatus::Partial
    } else {
        PercentageStatus::Low
    };

    PercentageCheck {
        status,
        is_over_limit: status == PercentageStatus::OverLimit,
    }
}

/// Filled entries paired with their contributions, in input order
pub fn filled_lines(entries: &[MaterialEntry]) -> Vec<MaterialLine> {
    filter_filled_entries(entries)
        .into_iter()
        .map(|entry| MaterialLine {
            entry: entry.clone(),
            contributions: compute_contributions(entry),
        })
        .collect()
}

/// Everything needed to present one calculation
#[derive(Debug, serde::Serialize)]
pub struct CalculationReport {
    pub lines: Vec<MaterialLine>,
    pub totals: AggregateResult,
    pub percentage: PercentageCheck,
}

impl CalculationReport {
    pub fn build(entries: &[MaterialEntry], sale_price: f64) -> Self {
        let totals = aggregate(entries, sale_price);
        Self {
            lines: filled_lines(entries),
            percentage: classify_percentage_total(totals.total_percentage),
            totals,
        }
    }

    /// Rebuild a report from already-derived lines and totals (saved calculations)
    pub fn from_saved(lines: Vec<MaterialLine>, totals: AggregateResult) -> Self {
        Self {
            lines,
            percentage: classify_percentage_total(totals.total_percentage),
            totals,
        }
    }
}

impl std::fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Blend Composition ===")?;
        if self.lines.is_empty() {
            writeln!(f, "  (no filled materials)")?;
        } else {
            writeln!(
                f,
                "{:>3}  {:<24} {:>7} {:>12} {:>8} {:>9} {:>12}",
                "#", "Material", "Octane", "Price", "%", "Oct x %", "Cost"
            )?;
            writeln!(f, "{}", "-".repeat(83))?;
            for (i, line) in self.lines.iter().enumerate() {
                writeln!(
                    f,
                    "{:>3}  {:<24} {:>7.1} {:>12.2} {:>7.2}% {:>9.2} {:>12.2}",
                    i + 1,
                    line.entry.name,
                    line.entry.octane_rating,
                    line.entry.unit_price,
                    line.entry.inclusion_percentage,
                    line.contributions.octane_contribution,
                    line.contributions.cost_contribution
                )?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Totals:")?;
        writeln!(
            f,
            "  Percentage:  {:.2}% ({})",
            self.totals.total_percentage, self.percentage.status
        )?;
        writeln!(f, "  Octane:      {:.2}", self.totals.total_octane)?;
        writeln!(f, "  Cost:        {:.2}", self.totals.total_cost)?;
        writeln!(f, "  Sale price:  {:.2}", self.totals.sale_price)?;

        let profit_label = if self.totals.profit < 0.0 { "loss" } else { "profit" };
        writeln!(f, "  Profit:      {:.2} ({})", self.totals.profit, profit_label)?;

        if self.percentage.is_over_limit {
            writeln!(f)?;
            writeln!(f, "Total percentage exceeds 100%; correct it before saving.")?;
        }

        Ok(())
    }
}
