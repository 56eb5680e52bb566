//! Error types for input parsing and saving

use thiserror::Error;

/// Raised while turning raw user or JSON input into material entries
#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid material '{0}': expected NAME:OCTANE:PRICE:PERCENT")]
    MalformedMaterial(String),
    #[error("duplicate material identifier '{0}'")]
    DuplicateIdentifier(String),
    #[error("invalid entry document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a calculation is refused for saving
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no filled materials to save")]
    NoMaterials,
    #[error("total percentage {total:.2}% exceeds 100%")]
    OverLimit { total: f64 },
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}
