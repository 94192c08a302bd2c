// Thu Oct 15 2026 - Alex

use crate::history::HistoryError;
use crate::image::{ImageError, ValidationError};
use crate::pattern::ScanError;
use thiserror::Error;

/// An analysis that started but produced no result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to load binary: {0}")]
    Image(#[from] ImageError),
    #[error("Pattern scan failed: {0}")]
    Scan(ScanError),
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl From<ScanError> for AnalysisError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Cancelled => AnalysisError::Cancelled,
            other => AnalysisError::Scan(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("Failed to record analysis: {0}")]
    History(#[from] HistoryError),
}

impl ServiceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Analysis(AnalysisError::Cancelled))
    }
}
