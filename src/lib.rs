// Thu Oct 15 2026 - Alex

pub mod catalog;
pub mod config;
pub mod engine;
pub mod history;
pub mod image;
pub mod output;
pub mod pattern;
pub mod resolver;
pub mod scoring;
pub mod server;
pub mod utils;

pub use catalog::{Catalog, Signature};
pub use config::Config;
pub use engine::{AnalysisService, CancelToken, Engine, EngineOptions};
pub use image::{BinaryImage, ModuleFile};
pub use output::{AnalysisResult, ReportGenerator};
pub use pattern::{Pattern, PatternSet};
pub use resolver::{OffsetResolver, Resolution};
pub use scoring::{ConfidenceScorer, ConfidenceTier};
