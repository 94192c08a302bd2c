// Thu Oct 15 2026 - Alex

use crate::image::ValidationError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    NodeAddon,
}

impl ModuleKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ModuleKind::NodeAddon => "node",
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        if ext.eq_ignore_ascii_case(ModuleKind::NodeAddon.extension()) {
            Some(ModuleKind::NodeAddon)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// An upload that passed the boundary checks. Downstream code takes this
/// instead of re-inspecting the filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    filename: String,
    kind: ModuleKind,
    size: usize,
}

impl ModuleFile {
    pub fn validate(filename: Option<&str>, size: usize, limits: &UploadLimits) -> Result<Self, ValidationError> {
        let filename = filename
            .map(base_name)
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::MissingFile)?;

        let kind = ModuleKind::from_filename(filename).ok_or_else(|| ValidationError::BadExtension {
            filename: filename.to_string(),
            expected: ModuleKind::NodeAddon.extension(),
        })?;

        if size > limits.max_bytes {
            return Err(ValidationError::Oversize {
                size,
                max: limits.max_bytes,
            });
        }

        Ok(Self {
            filename: filename.to_string(),
            kind,
            size,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path).trim()
}
