// Thu Oct 15 2026 - Alex

pub mod cancel;
pub mod core;
pub mod error;
pub mod service;

pub use self::core::{Engine, EngineOptions};
pub use cancel::CancelToken;
pub use error::{AnalysisError, ServiceError};
pub use service::{AnalysisOutcome, AnalysisService};
