use std::fmt;

use crate::fields::LogicalField;
use crate::model::Side;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (negative threshold, empty column list, etc.).
    ConfigValidation(String),
    /// A mandatory logical field resolved to no column in the source headers.
    Configuration {
        side: Side,
        field: LogicalField,
        candidates: Vec<String>,
    },
    /// CSV decode error.
    Csv(String),
    /// Internal invariant broken (e.g. a joined key that exists on neither side).
    Invariant(String),
    /// JSON serialization error.
    Json(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Configuration { side, field, candidates } => {
                write!(
                    f,
                    "configuration error: {side} source has no column for '{field}' (tried: {})",
                    if candidates.is_empty() {
                        "<none configured>".to_string()
                    } else {
                        candidates.join(", ")
                    }
                )
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Invariant(msg) => write!(f, "invariant violated: {msg}"),
            Self::Json(msg) => write!(f, "JSON serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}
