//! In-progress blend state
//!
//! A `BlendSheet` owns the entry list and sale price being edited. Totals are
//! never cached on it; every query recomputes from the current entries.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::calculator::{self, CalculationReport};
use crate::error::InputError;
use crate::input::{self, EntryDocument};
use crate::models::{AggregateResult, MaterialEntry, MaterialLine, PercentageCheck};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlendSheet {
    sale_price: f64,
    entries: Vec<MaterialEntry>,
}

impl BlendSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sheet from parsed entries, rejecting duplicate identifiers
    pub fn from_entries(entries: Vec<MaterialEntry>, sale_price: f64) -> Result<Self, InputError> {
        input::ensure_unique_identifiers(&entries)?;
        Ok(Self {
            sale_price,
            entries,
        })
    }

    pub fn entries(&self) -> &[MaterialEntry] {
        &self.entries
    }

    pub fn sale_price(&self) -> f64 {
        self.sale_price
    }

    pub fn set_sale_price(&mut self, sale_price: f64) {
        self.sale_price = sale_price;
    }

    /// Insert an entry, or replace the one with the same identifier in place
    pub fn upsert(&mut self, entry: MaterialEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.identifier == entry.identifier)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, identifier: &str) -> Option<MaterialEntry> {
        let index = self.entries.iter().position(|e| e.identifier == identifier)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.sale_price = 0.0;
    }

    /// Next free positional identifier
    pub fn next_identifier(&self) -> String {
        let mut n = self.entries.len() + 1;
        while self.entries.iter().any(|e| e.identifier == n.to_string()) {
            n += 1;
        }
        n.to_string()
    }

    /// Merge a parsed document into the sheet
    ///
    /// Entries with a known identifier replace the existing one. The document's
    /// sale price, when present, wins.
    pub fn merge(&mut self, document: EntryDocument) {
        if let Some(price) = document.sale_price {
            self.sale_price = price;
        }
        for entry in document.entries {
            self.upsert(entry);
        }
    }

    pub fn summary(&self) -> AggregateResult {
        calculator::aggregate(&self.entries, self.sale_price)
    }

    pub fn percentage_check(&self) -> PercentageCheck {
        calculator::classify_percentage_total(self.summary().total_percentage)
    }

    /// The selected composition: filled entries with their contributions
    pub fn filled_lines(&self) -> Vec<MaterialLine> {
        calculator::filled_lines(&self.entries)
    }

    pub fn report(&self) -> CalculationReport {
        CalculationReport::build(&self.entries, self.sale_price)
    }

    /// Load a draft previously written with [`BlendSheet::save_draft`]
    ///
    /// Any entry document is accepted, so hand-written files load too.
    pub fn load_draft(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = input::parse_entry_document(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut sheet = Self::new();
        sheet.merge(document);
        Ok(sheet)
    }

    /// Write the sheet as JSON
    ///
    /// JSON has no infinities, so a sheet holding a non-finite number is refused
    /// rather than written with a value that would reload as zero.
    pub fn save_draft(&self, path: &Path) -> Result<()> {
        if !self.sale_price.is_finite() {
            bail!("Sale price {} cannot be written to a draft", self.sale_price);
        }
        if let Some(entry) = self.entries.iter().find(|e| {
            !(e.octane_rating.is_finite()
                && e.unit_price.is_finite()
                && e.inclusion_percentage.is_finite())
        }) {
            bail!(
                "Material '{}' has a non-finite value and cannot be written to a draft",
                entry.identifier
            );
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
