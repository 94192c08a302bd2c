// Thu Oct 15 2026 - Alex

use thiserror::Error;

/// Rejections raised at the upload boundary, before any scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file was provided")]
    MissingFile,
    #[error("Invalid file type: {filename}. Only .{expected} files are accepted")]
    BadExtension { filename: String, expected: &'static str },
    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    Oversize { size: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Binary truncated: {len} bytes, at least {min} required")]
    Truncated { len: usize, min: usize },
    #[error("Section {name} [{start:#x}, {end:#x}) lies outside a {len} byte image")]
    SectionOutOfBounds { name: String, start: usize, end: usize, len: usize },
}
