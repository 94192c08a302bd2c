// Thu Oct 15 2026 - Alex

pub mod binary;
pub mod error;
pub mod upload;

pub use binary::{BinaryImage, ImageFormat, Section, MIN_IMAGE_LEN};
pub use error::{ImageError, ValidationError};
pub use upload::{ModuleFile, ModuleKind, UploadLimits};
