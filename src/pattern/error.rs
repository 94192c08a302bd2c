// Thu Oct 15 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Invalid pattern byte: {0}")]
    InvalidByte(String),
    #[error("Pattern has {bytes} bytes but {mask} mask entries")]
    LengthMismatch { bytes: usize, mask: usize },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Pattern {0} has no fixed bytes to anchor on")]
    NoAnchor(usize),
    #[error("Failed to build search automaton: {0}")]
    Automaton(String),
    #[error("Scan cancelled")]
    Cancelled,
}
