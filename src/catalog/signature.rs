// Thu Oct 15 2026 - Alex

use crate::catalog::CatalogError;
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFERRED_SECTION: &str = ".text";
pub const DEFAULT_MIN_SCORE: f64 = 0.35;

/// One target function and the bytes that identify it.
#[derive(Debug, Clone)]
pub struct Signature {
    pub id: String,
    pub name: String,
    pub pattern: Pattern,
    pub preferred_section: String,
    pub min_score: f64,
}

impl Signature {
    /// Compares section names the way the formats spell them:
    /// `.text` (ELF/PE) and `__text` (Mach-O) are the same section.
    pub fn prefers_section(&self, section_name: &str) -> bool {
        let normalize = |name: &str| name.trim_start_matches(|c| c == '.' || c == '_').to_ascii_lowercase();
        !section_name.is_empty() && normalize(&self.preferred_section) == normalize(section_name)
    }
}

/// The serialized form of a signature, as written in catalog files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureDef {
    pub id: String,
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub preferred_section: Option<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
}

impl SignatureDef {
    pub fn new(id: &str, name: &str, pattern: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            pattern: pattern.to_string(),
            preferred_section: None,
            min_score: None,
        }
    }

    pub fn with_section(mut self, section: &str) -> Self {
        self.preferred_section = Some(section.to_string());
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn compile(self) -> Result<Signature, CatalogError> {
        if self.id.trim().is_empty() || self.name.trim().is_empty() {
            return Err(CatalogError::MissingIdentity);
        }

        let pattern = Pattern::from_ida_pattern(&self.pattern).map_err(|source| CatalogError::BadPattern {
            id: self.id.clone(),
            source,
        })?;

        if pattern.is_empty() {
            return Err(CatalogError::EmptyPattern(self.id));
        }
        if pattern.is_all_wildcards() {
            return Err(CatalogError::AllWildcards(self.id));
        }

        let min_score = self.min_score.unwrap_or(DEFAULT_MIN_SCORE);
        if !(0.0..=1.0).contains(&min_score) {
            return Err(CatalogError::BadMinScore {
                id: self.id,
                value: min_score,
            });
        }

        Ok(Signature {
            id: self.id,
            name: self.name,
            pattern,
            preferred_section: self
                .preferred_section
                .unwrap_or_else(|| DEFAULT_PREFERRED_SECTION.to_string()),
            min_score,
        })
    }
}

impl From<&Signature> for SignatureDef {
    fn from(signature: &Signature) -> Self {
        Self {
            id: signature.id.clone(),
            name: signature.name.clone(),
            pattern: signature.pattern.to_hex_string(),
            preferred_section: Some(signature.preferred_section.clone()),
            min_score: Some(signature.min_score),
        }
    }
}
