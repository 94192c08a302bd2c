// Thu Oct 15 2026 - Alex

use crate::output::{AnalysisResult, FunctionOutcome};
use chrono::SecondsFormat;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const REPORT_TITLE: &str = "DISCORD VOICE NODE OFFSET FINDER RESULTS";
pub const REPORT_FILENAME: &str = "offset.txt";

const RULE: &str = "================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

pub struct ReportGenerator {
    format: ReportFormat,
    include_details: bool,
}

impl ReportGenerator {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            include_details: true,
        }
    }

    pub fn with_details(mut self, include: bool) -> Self {
        self.include_details = include;
        self
    }

    /// The downloadable `offset.txt` rendering.
    pub fn text(result: &AnalysisResult) -> String {
        Self::new(ReportFormat::Text).generate(result)
    }

    pub fn generate(&self, result: &AnalysisResult) -> String {
        match self.format {
            ReportFormat::Text => self.generate_text(result),
            ReportFormat::Json => self.generate_json(result),
        }
    }

    pub fn write_to_file(&self, result: &AnalysisResult, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(self.generate(result).as_bytes())?;
        writer.flush()
    }

    fn generate_text(&self, result: &AnalysisResult) -> String {
        let mut report = String::new();

        report.push_str(RULE);
        report.push('\n');
        report.push_str(REPORT_TITLE);
        report.push('\n');
        report.push_str(RULE);
        report.push('\n');
        report.push_str(&format!("File: {}\n", result.filename));
        report.push_str(&format!(
            "Analyzed: {}\n",
            result.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        report.push_str(&format!("Functions analyzed: {}\n", result.total_functions));
        report.push_str(&format!("Functions found: {}\n", result.functions_found));
        report.push_str(&format!("High confidence matches: {}\n", result.high_confidence_matches));
        report.push_str(&format!("Success rate: {:.1}%\n", result.success_rate));

        if self.include_details {
            report.push('\n');
            report.push_str("DETAILED RESULTS:\n");
            report.push_str(THIN_RULE);
            report.push('\n');
            for outcome in result.per_function.values() {
                report.push_str(&detail_line(outcome));
                report.push('\n');
            }
        }

        report
    }

    fn generate_json(&self, result: &AnalysisResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }
}

fn detail_line(outcome: &FunctionOutcome) -> String {
    match (outcome.offset, &outcome.section, outcome.tier) {
        (Some(offset), Some(section), Some(tier)) => format!(
            "{}: 0x{:X} [{}] ({}, {:.0}%)",
            outcome.name,
            offset,
            section,
            tier,
            outcome.confidence * 100.0
        ),
        _ => format!("{}: not found", outcome.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::image::ImageFormat;
    use crate::output::tests::{resolved, sample_catalog};
    use crate::resolver::{NotFoundReason, Resolution};
    use crate::scoring::ConfidenceTier;
    use chrono::TimeZone;
    use chrono::Utc;

    fn sample_result() -> AnalysisResult {
        let catalog = sample_catalog();
        let resolutions = vec![
            resolved(0x1A2B, ConfidenceTier::High, 1.0),
            Resolution::NotFound(NotFoundReason::NoCandidates),
            resolved(0x30, ConfidenceTier::Medium, 0.5),
        ];
        let timestamp = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        AnalysisResult::from_resolutions("discord_voice.node", &catalog, ImageFormat::Elf, &resolutions, timestamp)
    }

    #[test]
    fn test_text_report_layout() {
        let text = ReportGenerator::text(&sample_result());

        assert!(text.contains(REPORT_TITLE));
        assert!(text.contains("File: discord_voice.node\n"));
        assert!(text.contains("Analyzed: 2026-10-15T12:00:00Z\n"));
        assert!(text.contains("Functions analyzed: 3\n"));
        assert!(text.contains("Functions found: 2\n"));
        assert!(text.contains("High confidence matches: 1\n"));
        assert!(text.contains("Success rate: 66.7%\n"));
        assert!(text.contains("DETAILED RESULTS:"));

        let details: Vec<&str> = text.lines().skip_while(|l| *l != THIN_RULE).skip(1).collect();
        assert_eq!(
            details,
            vec![
                "Alpha: 0x1A2B [.text] (high, 100%)",
                "Beta: not found",
                "Gamma: 0x30 [.text] (medium, 50%)",
            ]
        );
    }

    #[test]
    fn test_report_is_deterministic() {
        let result = sample_result();
        assert_eq!(ReportGenerator::text(&result), ReportGenerator::text(&result.clone()));
    }

    #[test]
    fn test_summary_only() {
        let text = ReportGenerator::new(ReportFormat::Text)
            .with_details(false)
            .generate(&sample_result());
        assert!(text.contains("Functions analyzed: 3"));
        assert!(!text.contains("DETAILED RESULTS:"));
    }

    #[test]
    fn test_empty_catalog_report() {
        let catalog = Catalog::from_defs("empty", Vec::new()).unwrap();
        let result = AnalysisResult::from_resolutions("x.node", &catalog, ImageFormat::Raw, &[], Utc::now());
        let text = ReportGenerator::text(&result);
        assert!(text.contains("Functions analyzed: 0"));
        assert!(text.contains("Success rate: 0.0%"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join(REPORT_FILENAME);
        let result = sample_result();

        ReportGenerator::new(ReportFormat::Text).write_to_file(&result, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ReportGenerator::text(&result));

        let json_path = dir.path().join("result.json");
        ReportGenerator::new(ReportFormat::Json).write_to_file(&result, &json_path).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.filename, result.filename);
        assert_eq!(parsed.per_function.keys().collect::<Vec<_>>(), result.per_function.keys().collect::<Vec<_>>());
        assert_eq!(parsed.timestamp, result.timestamp);
    }
}
