// Thu Oct 15 2026 - Alex

pub mod report;

pub use report::{ReportFormat, ReportGenerator};

use crate::catalog::Catalog;
use crate::image::ImageFormat;
use crate::resolver::{NotFoundReason, Resolution};
use crate::scoring::ConfidenceTier;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionOutcome {
    pub name: String,
    pub found: bool,
    /// Section-relative offset.
    pub offset: Option<usize>,
    pub file_offset: Option<usize>,
    pub section: Option<String>,
    pub confidence: f64,
    pub tier: Option<ConfidenceTier>,
    pub candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NotFoundReason>,
}

impl FunctionOutcome {
    fn from_resolution(name: &str, resolution: &Resolution) -> Self {
        let not_found = |confidence: f64, candidates: usize, reason: Option<NotFoundReason>| Self {
            name: name.to_string(),
            found: false,
            offset: None,
            file_offset: None,
            section: None,
            confidence,
            tier: None,
            candidates,
            reason,
        };

        match resolution {
            Resolution::Resolved(function) => Self {
                name: name.to_string(),
                found: true,
                offset: Some(function.offset),
                file_offset: Some(function.file_offset),
                section: Some(function.section.clone()),
                confidence: function.score,
                tier: Some(function.tier),
                candidates: function.candidates,
                reason: None,
            },
            Resolution::NotFound(reason) => match *reason {
                NotFoundReason::BelowThreshold { best_score, candidates } => not_found(best_score, candidates, Some(*reason)),
                NotFoundReason::NoCandidates => not_found(0.0, 0, Some(*reason)),
            },
            Resolution::Unscanned | Resolution::CandidatesFound(_) => not_found(0.0, 0, None),
        }
    }

    pub fn is_high_confidence(&self) -> bool {
        self.tier == Some(ConfidenceTier::High)
    }
}

/// Outcome of one analysis. Never modified once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    pub total_functions: usize,
    pub functions_found: usize,
    pub high_confidence_matches: usize,
    pub success_rate: f64,
    pub image_format: ImageFormat,
    pub catalog_version: String,
    pub per_function: IndexMap<String, FunctionOutcome>,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    /// `resolutions` must be in catalog order, one per signature.
    pub fn from_resolutions(
        filename: &str,
        catalog: &Catalog,
        image_format: ImageFormat,
        resolutions: &[Resolution],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let per_function: IndexMap<String, FunctionOutcome> = catalog.all_signatures()
            .iter()
            .zip(resolutions)
            .map(|(signature, resolution)| {
                (signature.id.clone(), FunctionOutcome::from_resolution(&signature.name, resolution))
            })
            .collect();

        let total_functions = catalog.count();
        let functions_found = per_function.values().filter(|f| f.found).count();
        let high_confidence_matches = per_function.values().filter(|f| f.is_high_confidence()).count();

        Self {
            filename: filename.to_string(),
            total_functions,
            functions_found,
            high_confidence_matches,
            success_rate: success_rate(functions_found, total_functions),
            image_format,
            catalog_version: catalog.version().to_string(),
            per_function,
            timestamp,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.functions_found == 0
    }
}

pub fn success_rate(found: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * found as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SignatureDef;
    use crate::resolver::ResolvedFunction;

    pub(crate) fn sample_catalog() -> Catalog {
        Catalog::from_defs(
            "test-1",
            vec![
                SignatureDef::new("alpha", "Alpha", "01 02 03"),
                SignatureDef::new("beta", "Beta", "04 05 06"),
                SignatureDef::new("gamma", "Gamma", "07 08 09"),
            ],
        )
        .unwrap()
    }

    pub(crate) fn resolved(offset: usize, tier: ConfidenceTier, score: f64) -> Resolution {
        Resolution::Resolved(ResolvedFunction {
            file_offset: offset + 0x40,
            offset,
            section: ".text".to_string(),
            score,
            tier,
            candidates: 1,
        })
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(1, 4), 25.0);
        assert_eq!(success_rate(3, 3), 100.0);
    }

    #[test]
    fn test_counts_and_order() {
        let catalog = sample_catalog();
        let resolutions = vec![
            resolved(0x10, ConfidenceTier::High, 1.0),
            Resolution::NotFound(NotFoundReason::BelowThreshold { best_score: 0.2, candidates: 4 }),
            resolved(0x20, ConfidenceTier::Medium, 0.6),
        ];

        let result = AnalysisResult::from_resolutions("voice.node", &catalog, ImageFormat::Elf, &resolutions, Utc::now());

        assert_eq!(result.total_functions, 3);
        assert_eq!(result.functions_found, 2);
        assert_eq!(result.high_confidence_matches, 1);
        assert!((result.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.per_function.keys().collect::<Vec<_>>(), vec!["alpha", "beta", "gamma"]);

        let beta = &result.per_function["beta"];
        assert!(!beta.found);
        assert_eq!(beta.tier, None);
        assert_eq!(beta.offset, None);
        assert!((beta.confidence - 0.2).abs() < 1e-9);
        assert_eq!(beta.candidates, 4);
        assert_eq!(result.per_function["gamma"].file_offset, Some(0x60));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::from_defs("empty", Vec::new()).unwrap();
        let result = AnalysisResult::from_resolutions("a.node", &catalog, ImageFormat::Raw, &[], Utc::now());
        assert_eq!(result.total_functions, 0);
        assert_eq!(result.success_rate, 0.0);
        assert!(result.is_degraded());
    }

    #[test]
    fn test_json_shape() {
        let catalog = sample_catalog();
        let resolutions = vec![
            resolved(0x10, ConfidenceTier::High, 1.0),
            Resolution::NotFound(NotFoundReason::NoCandidates),
            Resolution::NotFound(NotFoundReason::NoCandidates),
        ];
        let result = AnalysisResult::from_resolutions("voice.node", &catalog, ImageFormat::Elf, &resolutions, Utc::now());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["filename"], "voice.node");
        assert_eq!(json["image_format"], "elf");
        assert_eq!(json["per_function"]["alpha"]["tier"], "high");
        assert_eq!(json["per_function"]["beta"]["reason"]["reason"], "no_candidates");
        assert!(json["per_function"]["beta"]["offset"].is_null());
        assert_eq!(json["per_function"]["beta"]["candidates"], 0);
    }
}
