// Thu Oct 15 2026 - Alex

use crate::catalog::Catalog;
use crate::engine::{AnalysisError, CancelToken};
use crate::image::BinaryImage;
use crate::output::AnalysisResult;
use crate::pattern::PatternSet;
use crate::resolver::OffsetResolver;
use crate::scoring::{ConfidenceScorer, ScoringConfig};
use crate::utils::logging::ScopedTimer;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Scan threads; `0` uses every core.
    pub threads: usize,
    pub chunk_size: Option<usize>,
    pub scoring: ScoringConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            chunk_size: None,
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }
}

/// Runs the scan, score and resolve stages against one catalog.
///
/// Holds nothing that changes between analyses, so a single engine is
/// shared by every request.
pub struct Engine {
    catalog: Arc<Catalog>,
    patterns: PatternSet,
    resolver: OffsetResolver,
    pool: rayon::ThreadPool,
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>, options: EngineOptions) -> Result<Self, AnalysisError> {
        let signatures = catalog.all_signatures().iter().map(|s| s.pattern.clone()).collect();
        let mut patterns = PatternSet::compile(signatures)?;
        if let Some(size) = options.chunk_size {
            patterns = patterns.with_chunk_size(size);
        }

        let threads = if options.threads == 0 { num_cpus::get() } else { options.threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("offset-scan-{}", i))
            .build()
            .map_err(|e| AnalysisError::ThreadPool(e.to_string()))?;

        log::debug!(
            "Engine ready: {} signatures, {} anchors, {} scan threads",
            catalog.count(),
            patterns.anchor_count(),
            threads
        );

        Ok(Self {
            catalog,
            patterns,
            resolver: OffsetResolver::new(ConfidenceScorer::new(options.scoring)),
            pool,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn analyze(&self, filename: &str, image: &BinaryImage, cancel: &CancelToken) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_at(filename, image, cancel, Utc::now())
    }

    /// Same as `analyze` with a caller-chosen timestamp, so equal inputs
    /// give equal results.
    pub fn analyze_at(
        &self,
        filename: &str,
        image: &BinaryImage,
        cancel: &CancelToken,
        timestamp: DateTime<Utc>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let _timer = ScopedTimer::new(&format!("analyze {}", filename));

        let matches = self.pool.install(|| self.patterns.scan(image, cancel))?;
        log::debug!("{}: {} raw matches across {} sections", filename, matches.len(), image.sections().len());

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let resolutions = self.resolver.resolve_all(&self.catalog, image, &matches);
        let result = AnalysisResult::from_resolutions(filename, &self.catalog, image.format(), &resolutions, timestamp);

        log::debug!(
            "{}: {}/{} functions found, {} high confidence",
            filename,
            result.functions_found,
            result.total_functions,
            result.high_confidence_matches
        );

        Ok(result)
    }
}
