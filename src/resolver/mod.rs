// Thu Oct 15 2026 - Alex

use crate::catalog::{Catalog, Signature};
use crate::image::BinaryImage;
use crate::pattern::RawMatch;
use crate::scoring::{CandidateSummary, ConfidenceScorer, ConfidenceTier};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFunction {
    pub file_offset: usize,
    /// Offset from the start of `section`.
    pub offset: usize,
    pub section: String,
    pub score: f64,
    pub tier: ConfidenceTier,
    pub candidates: usize,
}

impl ResolvedFunction {
    pub fn is_high_confidence(&self) -> bool {
        self.tier == ConfidenceTier::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NotFoundReason {
    NoCandidates,
    BelowThreshold { best_score: f64, candidates: usize },
}

/// Where a single signature stands during an analysis.
///
/// `Unscanned -> CandidatesFound -> Resolved | NotFound`. A signature with no
/// hits skips straight to `NotFound(NoCandidates)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Unscanned,
    CandidatesFound(CandidateSummary),
    Resolved(ResolvedFunction),
    NotFound(NotFoundReason),
}

impl Resolution {
    pub fn with_candidates(self, candidates: CandidateSummary) -> Self {
        match self {
            Resolution::Unscanned if candidates.is_empty() => Resolution::NotFound(NotFoundReason::NoCandidates),
            Resolution::Unscanned => Resolution::CandidatesFound(candidates),
            other => other,
        }
    }

    /// Picks the best candidate: highest score, then lowest file offset.
    pub fn resolve(self, signature: &Signature, image: &BinaryImage) -> Self {
        let candidates = match self {
            Resolution::CandidatesFound(candidates) => candidates,
            Resolution::Unscanned => return Resolution::NotFound(NotFoundReason::NoCandidates),
            done => return done,
        };

        let Some(best) = candidates.leaders.iter().min_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(Ordering::Equal)
                .then(a.offset.cmp(&b.offset))
        }) else {
            return Resolution::NotFound(NotFoundReason::NoCandidates);
        };

        if best.raw_score < signature.min_score {
            return Resolution::NotFound(NotFoundReason::BelowThreshold {
                best_score: best.raw_score,
                candidates: candidates.total,
            });
        }

        let Some(section) = image.section(best.section_index) else {
            return Resolution::NotFound(NotFoundReason::NoCandidates);
        };

        Resolution::Resolved(ResolvedFunction {
            file_offset: best.offset,
            offset: best.offset - section.start,
            section: section.label().to_string(),
            score: best.raw_score,
            tier: best.tier,
            candidates: candidates.total,
        })
    }

    pub fn resolved(&self) -> Option<&ResolvedFunction> {
        match self {
            Resolution::Resolved(function) => Some(function),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Resolution::Resolved(_) | Resolution::NotFound(_))
    }
}

pub struct OffsetResolver {
    scorer: ConfidenceScorer,
}

impl OffsetResolver {
    pub fn new(scorer: ConfidenceScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// One terminal resolution per catalog signature, in catalog order.
    /// `matches` use catalog indices as their pattern indices and are sorted
    /// by pattern index, as `PatternSet::scan` returns them.
    pub fn resolve_all(&self, catalog: &Catalog, image: &BinaryImage, matches: &[RawMatch]) -> Vec<Resolution> {
        catalog.all_signatures()
            .iter()
            .enumerate()
            .map(|(index, signature)| {
                let start = matches.partition_point(|m| m.pattern_index < index);
                let end = start + matches[start..].partition_point(|m| m.pattern_index == index);

                let summary = self.scorer.score_candidates(index, signature, image, &matches[start..end]);
                let resolution = Resolution::Unscanned
                    .with_candidates(summary)
                    .resolve(signature, image);

                match &resolution {
                    Resolution::Resolved(found) => log::debug!(
                        "{} resolved at 0x{:x} in {} ({:.2}, {} candidates)",
                        signature.name, found.offset, found.section, found.score, found.candidates
                    ),
                    Resolution::NotFound(reason) => log::debug!("{} not found: {:?}", signature.name, reason),
                    _ => {}
                }

                resolution
            })
            .collect()
    }
}

impl Default for OffsetResolver {
    fn default() -> Self {
        Self::new(ConfidenceScorer::default())
    }
}
