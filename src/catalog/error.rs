// Thu Oct 15 2026 - Alex

use crate::pattern::PatternError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Signature {0}: pattern is empty")]
    EmptyPattern(String),
    #[error("Signature {0}: pattern has no fixed bytes")]
    AllWildcards(String),
    #[error("Signature {id}: {source}")]
    BadPattern {
        id: String,
        #[source]
        source: PatternError,
    },
    #[error("Signature {id}: min_score {value} outside [0, 1]")]
    BadMinScore { id: String, value: f64 },
    #[error("Signature with empty id or name")]
    MissingIdentity,
    #[error("Duplicate signature id: {0}")]
    DuplicateId(String),
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}
