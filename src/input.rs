//! Parsing raw material input into typed entries
//!
//! Input arrives loosely typed: JSON saved by a form (numbers as strings,
//! blanks, nulls) or `NAME:OCTANE:PRICE:PERCENT` arguments typed on the command
//! line. Everything is normalized here so the calculator only ever sees
//! complete `MaterialEntry` values. Unreadable numbers become zero.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::InputError;
use crate::models::MaterialEntry;

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
        .expect("leading number pattern is valid")
});

/// Read the longest leading decimal literal of `text`, or zero
///
/// A lone comma is the decimal separator (`"12,5"` is 12.5). Once a point is
/// present, commas group thousands (`"1,234.5"` is 1234.5). Values that do not
/// fit a finite f64 (`"1e400"`) are zero, and so are words like `"Infinity"`.
pub fn parse_number(text: &str) -> f64 {
    let literal: String = text
        .trim_start()
        .chars()
        .take_while(|&c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ',' | 'e' | 'E'))
        .collect();
    let literal = if literal.contains('.') {
        literal.replace(',', "")
    } else {
        literal.replace(',', ".")
    };

    LEADING_NUMBER
        .find(&literal)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Coerce an arbitrary JSON value to a number, zero when it is not one
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_number(s),
        _ => 0.0,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `NAME:OCTANE:PRICE:PERCENT` argument
///
/// Numeric fields are taken from the right so the name may contain colons.
pub fn parse_material(
    spec: &str,
    identifier: impl Into<String>,
) -> Result<MaterialEntry, InputError> {
    let mut parts = spec.rsplitn(4, ':');
    let (Some(percentage), Some(price), Some(octane), Some(name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(InputError::MalformedMaterial(spec.to_string()));
    };

    Ok(MaterialEntry::new(
        identifier,
        name.trim(),
        parse_number(octane),
        parse_number(price),
        parse_number(percentage),
    ))
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default, alias = "id")]
    identifier: Value,
    #[serde(default)]
    name: Value,
    #[serde(default, alias = "octane")]
    octane_rating: Value,
    #[serde(default, alias = "price")]
    unit_price: Value,
    #[serde(default, alias = "percentage")]
    inclusion_percentage: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    List(Vec<RawEntry>),
    Sheet {
        #[serde(default)]
        sale_price: Value,
        #[serde(default)]
        entries: Vec<RawEntry>,
    },
}

/// Entries and an optional sale price read from a JSON document
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDocument {
    pub sale_price: Option<f64>,
    pub entries: Vec<MaterialEntry>,
}

/// Parse either a bare array of entries or `{ "sale_price": .., "entries": [..] }`
pub fn parse_entry_document(json: &str) -> Result<EntryDocument, InputError> {
    let (sale_price, raw_entries) = match serde_json::from_str::<RawDocument>(json)? {
        RawDocument::List(entries) => (None, entries),
        RawDocument::Sheet {
            sale_price,
            entries,
        } => {
            let price = (!sale_price.is_null()).then(|| coerce_number(&sale_price));
            (price, entries)
        }
    };

    let explicit: Vec<Option<String>> = raw_entries
        .iter()
        .map(|raw| coerce_text(&raw.identifier).filter(|id| !id.is_empty()))
        .collect();
    let mut taken: HashSet<String> = explicit.iter().flatten().cloned().collect();

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, (raw, identifier)) in raw_entries.iter().zip(explicit).enumerate() {
        // Missing ids are positional, skipping any the document already uses
        let identifier = identifier.unwrap_or_else(|| {
            let mut n = index + 1;
            while taken.contains(&n.to_string()) {
                n += 1;
            }
            taken.insert(n.to_string());
            n.to_string()
        });

        entries.push(MaterialEntry {
            identifier,
            name: coerce_text(&raw.name).unwrap_or_default(),
            octane_rating: coerce_number(&raw.octane_rating),
            unit_price: coerce_number(&raw.unit_price),
            inclusion_percentage: coerce_number(&raw.inclusion_percentage),
        });
    }

    ensure_unique_identifiers(&entries)?;
    Ok(EntryDocument { sale_price, entries })
}

/// Identifiers must be unique within one calculation
pub fn ensure_unique_identifiers(entries: &[MaterialEntry]) -> Result<(), InputError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.identifier.as_str()) {
            return Err(InputError::DuplicateIdentifier(entry.identifier.clone()));
        }
    }
    Ok(())
}
