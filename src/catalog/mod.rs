// Thu Oct 15 2026 - Alex

pub mod builtin;
pub mod error;
pub mod signature;

pub use error::CatalogError;
pub use signature::{Signature, SignatureDef};

use std::fs;
use std::path::Path;

/// The immutable set of signatures an engine searches for.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    signatures: Vec<Signature>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_defs(builtin::BUILTIN_VERSION, builtin::BUILTIN_SIGNATURES.iter().cloned())
    }

    pub fn from_defs<I>(version: &str, defs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = SignatureDef>,
    {
        let mut signatures: Vec<Signature> = Vec::new();

        for def in defs {
            let signature = def.compile()?;
            if signatures.iter().any(|s| s.id == signature.id) {
                return Err(CatalogError::DuplicateId(signature.id));
            }
            signatures.push(signature);
        }

        Ok(Self {
            version: version.to_string(),
            signatures,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_defs(&file.version, file.signatures)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&json)
    }

    /// Loads `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let catalog = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::builtin()?,
        };
        log::info!("Loaded signature catalog {} ({} signatures)", catalog.version, catalog.count());
        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn all_signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn count(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, serde::Deserialize)]
struct CatalogFile {
    version: String,
    signatures: Vec<SignatureDef>,
}
