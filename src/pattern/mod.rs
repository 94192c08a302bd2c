// Thu Oct 15 2026 - Alex

pub mod error;
pub mod pattern;
pub mod scanner;

pub use error::{PatternError, ScanError};
pub use pattern::Pattern;
pub use scanner::{PatternSet, RawMatch};
