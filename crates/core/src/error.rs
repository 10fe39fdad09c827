//! Error types for StreamViz

use thiserror::Error;

use crate::selection::SelectionMode;

/// Main error type for StreamViz core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid HUC code '{raw}' for level {level}")]
    InvalidHuc { raw: String, level: u8 },

    #[error("Unknown HUC level: {0}")]
    UnknownHucLevel(String),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Gauge feature {index} has no usable location")]
    MissingLocation { index: usize },

    #[error("Cannot select a {attempted} while in {active} mode")]
    InactiveMode {
        attempted: SelectionMode,
        active: SelectionMode,
    },

    #[error("Unknown dataset or variable: {0}")]
    UnknownDataset(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias for StreamViz core operations
pub type Result<T> = std::result::Result<T, Error>;
