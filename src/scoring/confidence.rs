// Thu Oct 15 2026 - Alex

use crate::catalog::Signature;
use crate::image::{BinaryImage, Section};
use crate::pattern::RawMatch;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub specificity_weight: f64,
    pub section_bonus: f64,
    pub section_penalty: f64,
    pub threshold_high: f64,
    pub threshold_low: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            specificity_weight: 0.8,
            section_bonus: 0.2,
            section_penalty: 0.2,
            threshold_high: 0.75,
            threshold_low: 0.5,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("specificity_weight", self.specificity_weight),
            ("section_bonus", self.section_bonus),
            ("section_penalty", self.section_penalty),
            ("threshold_high", self.threshold_high),
            ("threshold_low", self.threshold_low),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("scoring.{} must be between 0.0 and 1.0", name));
            }
        }
        if self.threshold_low > self.threshold_high {
            return Err("scoring.threshold_low must not exceed scoring.threshold_high".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionAgreement {
    Preferred,
    /// The image has no section table, so placement says nothing.
    Unstructured,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub signature_index: usize,
    pub offset: usize,
    pub section_index: usize,
    pub raw_score: f64,
    pub tier: ConfidenceTier,
    pub agreement: SectionAgreement,
}

/// What survives scoring for one signature: the total hit count and the
/// lowest-offset hit of each section-agreement class. All hits of a class
/// score the same, so the other hits cannot win.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateSummary {
    pub total: usize,
    pub leaders: Vec<ScoredMatch>,
}

impl CandidateSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Rates candidate matches.
///
/// `raw_score = clamp(w * specificity + section_term, 0, 1) / candidates`.
/// Every candidate of a signature shares the same divisor, so ambiguity
/// lowers all of them together instead of silently picking one.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn section_agreement(&self, signature: &Signature, section: &Section) -> SectionAgreement {
        if section.is_unnamed() {
            SectionAgreement::Unstructured
        } else if signature.prefers_section(&section.name) {
            SectionAgreement::Preferred
        } else {
            SectionAgreement::Mismatch
        }
    }

    pub fn tier(&self, score: f64) -> ConfidenceTier {
        if score >= self.config.threshold_high {
            ConfidenceTier::High
        } else if score >= self.config.threshold_low {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn score(&self, signature: &Signature, agreement: SectionAgreement, candidates: usize) -> f64 {
        let specificity = signature.pattern.specificity() * self.config.specificity_weight;
        let section_term = match agreement {
            SectionAgreement::Preferred => self.config.section_bonus,
            SectionAgreement::Unstructured => 0.0,
            SectionAgreement::Mismatch => -self.config.section_penalty,
        };

        (specificity + section_term).clamp(0.0, 1.0) / candidates.max(1) as f64
    }

    /// Scores the hits of one signature. `matches` must all belong to
    /// `signature_index`; only the per-class leaders are kept.
    pub fn score_candidates(
        &self,
        signature_index: usize,
        signature: &Signature,
        image: &BinaryImage,
        matches: &[RawMatch],
    ) -> CandidateSummary {
        let total = matches.len();
        let mut leaders: Vec<ScoredMatch> = Vec::with_capacity(3);

        for m in matches {
            let Some(section) = image.section(m.section_index) else {
                continue;
            };
            let agreement = self.section_agreement(signature, section);

            match leaders.iter_mut().find(|l| l.agreement == agreement) {
                Some(leader) if leader.offset <= m.offset => {}
                Some(leader) => {
                    leader.offset = m.offset;
                    leader.section_index = m.section_index;
                }
                None => {
                    let raw_score = self.score(signature, agreement, total);
                    leaders.push(ScoredMatch {
                        signature_index,
                        offset: m.offset,
                        section_index: m.section_index,
                        raw_score,
                        tier: self.tier(raw_score),
                        agreement,
                    });
                }
            }
        }

        CandidateSummary { total, leaders }
    }
}
