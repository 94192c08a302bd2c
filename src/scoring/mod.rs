// Thu Oct 15 2026 - Alex

pub mod confidence;

pub use confidence::{
    CandidateSummary, ConfidenceScorer, ConfidenceTier, ScoredMatch, ScoringConfig, SectionAgreement,
};
