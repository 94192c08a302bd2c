// Thu Oct 15 2026 - Alex

use crate::engine::EngineOptions;
use crate::image::upload::{UploadLimits, DEFAULT_MAX_UPLOAD_BYTES};
use crate::scoring::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "OFFSET_FINDER_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value {value:?} for {var}")]
    Env { var: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// JSON signature catalog; the built-in table when unset.
    pub catalog_path: Option<PathBuf>,
    /// JSON lines history file; in-memory history when unset.
    pub history_path: Option<PathBuf>,
    /// Directory that receives a copy of every `offset.txt`.
    pub report_dir: Option<PathBuf>,
    pub timeout_seconds: u64,
    /// Scan threads; `0` means one per core.
    pub threads: usize,
    pub scan_chunk_size: Option<usize>,
    pub log_level: String,
    pub scoring: ScoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            catalog_path: None,
            history_path: None,
            report_dir: None,
            timeout_seconds: 60,
            threads: 0,
            scan_chunk_size: None,
            log_level: "info".to_string(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Defaults, then `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `OFFSET_FINDER_*` overrides read through `lookup`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.host = v;
        }
        if let Some(v) = get("PORT") {
            self.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = get("MAX_UPLOAD") {
            self.max_upload_bytes = parse_env("MAX_UPLOAD", &v)?;
        }
        if let Some(v) = get("CATALOG") {
            self.catalog_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("HISTORY") {
            self.history_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("REPORT_DIR") {
            self.report_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("TIMEOUT_SECS") {
            self.timeout_seconds = parse_env("TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("THREADS") {
            self.threads = parse_env("THREADS", &v)?;
        }
        if let Some(v) = get("LOG") {
            self.log_level = v;
        }

        Ok(self)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be greater than 0".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeout_seconds must be greater than 0".to_string()));
        }
        if self.scan_chunk_size == Some(0) {
            return Err(ConfigError::Invalid("scan_chunk_size must be greater than 0".to_string()));
        }
        self.scoring.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_bytes: self.max_upload_bytes,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        let options = EngineOptions::default()
            .with_threads(self.threads)
            .with_scoring(self.scoring);
        match self.scan_chunk_size {
            Some(size) => options.with_chunk_size(size),
            None => options,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: format!("{}{}", ENV_PREFIX, name),
        value: value.to_string(),
    })
}
