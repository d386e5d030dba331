//! Error types for Timeline Flux

use thiserror::Error;

/// Errors that can occur while normalizing a history or building its map
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Failed to parse location history: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed location string: {0:?}")]
    MalformedLocation(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid number in field {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("Missing column in table: {0}")]
    MissingColumn(String),

    #[error("No visits with coordinates to center the map on")]
    NoVisits,

    #[error("Palette of {palette_size} colors exhausted at category {category:?}")]
    PaletteExhausted {
        category: String,
        palette_size: usize,
    },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
