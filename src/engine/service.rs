// Thu Oct 15 2026 - Alex

use crate::engine::{AnalysisError, CancelToken, Engine, ServiceError};
use crate::history::{AnalysisRecord, HistoryStore, LatestReport, StoredReport};
use crate::image::{BinaryImage, ModuleFile, UploadLimits, ValidationError};
use crate::output::report::REPORT_FILENAME;
use crate::output::{AnalysisResult, ReportGenerator};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub record_id: Uuid,
    pub result: AnalysisResult,
    pub report: String,
}

/// Validate, analyze, then publish: one history record and a fresh latest
/// report per successful analysis, nothing at all for a failed one.
pub struct AnalysisService {
    engine: Arc<Engine>,
    history: Arc<dyn HistoryStore>,
    latest: LatestReport,
    /// Held across the history append and the latest-report swap so the
    /// newest record and the downloadable report always agree.
    publish: Mutex<()>,
    limits: UploadLimits,
    report_dir: Option<PathBuf>,
}

impl AnalysisService {
    pub fn new(engine: Arc<Engine>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            engine,
            history,
            latest: LatestReport::new(),
            publish: Mutex::new(()),
            limits: UploadLimits::default(),
            report_dir: None,
        }
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_report_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.report_dir = dir;
        self
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn latest_report(&self) -> Option<StoredReport> {
        self.latest.get()
    }

    pub fn validate(&self, filename: Option<&str>, size: usize) -> Result<ModuleFile, ValidationError> {
        ModuleFile::validate(filename, size, &self.limits)
    }

    pub fn submit(&self, filename: Option<&str>, data: Bytes, cancel: &CancelToken) -> Result<AnalysisOutcome, ServiceError> {
        self.submit_at(filename, data, cancel, Utc::now())
    }

    pub fn submit_at(
        &self,
        filename: Option<&str>,
        data: Bytes,
        cancel: &CancelToken,
        timestamp: DateTime<Utc>,
    ) -> Result<AnalysisOutcome, ServiceError> {
        let file = self.validate(filename, data.len())?;
        let image = BinaryImage::load(&file, data).map_err(AnalysisError::from)?;
        let result = self.engine.analyze_at(file.filename(), &image, cancel, timestamp)?;
        let report = ReportGenerator::text(&result);

        // Past this point the result is published; a late cancel must wait.
        if !cancel.try_commit() {
            return Err(AnalysisError::Cancelled.into());
        }

        let record = AnalysisRecord::new(
            &result.filename,
            result.total_functions,
            result.functions_found,
            result.timestamp,
        );
        let record_id = {
            let _publish = self.publish.lock();
            let record_id = self.history.append(record)?;
            self.latest.replace(StoredReport {
                record_id,
                filename: result.filename.clone(),
                text: report.clone(),
            });
            self.write_report_file(&report);
            record_id
        };

        log::info!(
            "Analyzed {} ({} bytes): {}/{} functions ({:.1}%)",
            result.filename,
            file.size(),
            result.functions_found,
            result.total_functions,
            result.success_rate
        );

        Ok(AnalysisOutcome {
            record_id,
            result,
            report,
        })
    }

    fn write_report_file(&self, report: &str) {
        let Some(dir) = &self.report_dir else {
            return;
        };
        let path = dir.join(REPORT_FILENAME);
        if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::write(&path, report)) {
            log::warn!("Failed to write {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, SignatureDef};
    use crate::engine::EngineOptions;
    use crate::history::{HistoryError, MemoryHistory};
    use crate::image::binary::fixtures::minimal_elf;
    use crate::image::ImageError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Stalls inside its first append, widening the window between the
    /// history write and the latest-report swap.
    #[derive(Default)]
    struct StallingHistory {
        inner: MemoryHistory,
        stalled: AtomicBool,
    }

    impl HistoryStore for StallingHistory {
        fn append(&self, record: AnalysisRecord) -> Result<Uuid, HistoryError> {
            let id = self.inner.append(record)?;
            if !self.stalled.swap(true, Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(300));
            }
            Ok(id)
        }

        fn list(&self) -> Vec<AnalysisRecord> {
            self.inner.list()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_defs(
                "test",
                vec![
                    SignatureDef::new("stereo", "Stereo", "C7 44 24 ?? 02 00 00 00"),
                    SignatureDef::new("bitrate", "Bitrate", "B8 00 F4 01 00"),
                ],
            )
            .unwrap(),
        )
    }

    fn service() -> AnalysisService {
        let engine = Engine::new(catalog(), EngineOptions::default().with_threads(1)).unwrap();
        AnalysisService::new(Arc::new(engine), Arc::new(MemoryHistory::new()))
    }

    fn sample_module() -> Bytes {
        let mut text = vec![0xCCu8; 128];
        text[16..24].copy_from_slice(&[0xC7, 0x44, 0x24, 0x30, 0x02, 0x00, 0x00, 0x00]);
        Bytes::from(minimal_elf(&text))
    }

    #[test]
    fn test_successful_submit_records_once() {
        let service = service();
        let outcome = service.submit(Some("discord_voice.node"), sample_module(), &CancelToken::new()).unwrap();

        assert_eq!(outcome.result.functions_found, 1);
        assert_eq!(outcome.result.per_function["stereo"].offset, Some(16));
        assert_eq!(service.history().len(), 1);
        assert_eq!(service.history().list()[0].id, outcome.record_id);

        let latest = service.latest_report().unwrap();
        assert_eq!(latest.record_id, outcome.record_id);
        assert_eq!(latest.text, outcome.report);
        assert!(latest.text.contains("Stereo: 0x10 [.text]"));
    }

    #[test]
    fn test_degraded_result_is_persisted() {
        let service = service();
        let outcome = service.submit(Some("zeros.node"), Bytes::from(vec![0u8; 1024]), &CancelToken::new()).unwrap();
        assert_eq!(outcome.result.functions_found, 0);
        assert_eq!(service.history().len(), 1);
    }

    #[test]
    fn test_rejected_uploads_leave_no_trace() {
        let service = service();

        let err = service.submit(Some("test.txt"), sample_module(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::BadExtension { .. })));

        let err = service.submit(None, sample_module(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::MissingFile)));

        let err = service.submit(Some("tiny.node"), Bytes::from_static(b"\x7fE"), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Analysis(AnalysisError::Image(ImageError::Truncated { .. }))));

        assert!(service.history().is_empty());
        assert!(service.latest_report().is_none());
    }

    #[test]
    fn test_oversize_rejected() {
        let service = service().with_limits(UploadLimits { max_bytes: 64 });
        let err = service.submit(Some("big.node"), sample_module(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::Oversize { .. })));
    }

    #[test]
    fn test_cancelled_before_commit_writes_nothing() {
        let service = service();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = service.submit(Some("voice.node"), sample_module(), &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert!(service.history().is_empty());
    }

    #[test]
    fn test_committed_analysis_ignores_late_cancel() {
        let service = service();
        let cancel = CancelToken::new();
        service.submit(Some("voice.node"), sample_module(), &cancel).unwrap();
        assert!(!cancel.cancel());
    }

    #[test]
    fn test_repeated_submits_are_deterministic() {
        let service = service();
        let timestamp = Utc::now();
        let first = service.submit_at(Some("voice.node"), sample_module(), &CancelToken::new(), timestamp).unwrap();
        let second = service.submit_at(Some("voice.node"), sample_module(), &CancelToken::new(), timestamp).unwrap();

        assert_eq!(first.result, second.result);
        assert_eq!(first.report, second.report);
        assert_ne!(first.record_id, second.record_id);
        assert_eq!(service.history().len(), 2);
    }

    #[test]
    fn test_report_dir_receives_offset_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service().with_report_dir(Some(dir.path().join("out")));
        let outcome = service.submit(Some("voice.node"), sample_module(), &CancelToken::new()).unwrap();

        let written = std::fs::read_to_string(dir.path().join("out").join(REPORT_FILENAME)).unwrap();
        assert_eq!(written, outcome.report);
    }

    #[test]
    fn test_concurrent_submits_publish_newest_report() {
        let engine = Engine::new(catalog(), EngineOptions::default().with_threads(1)).unwrap();
        let service = Arc::new(AnalysisService::new(Arc::new(engine), Arc::new(StallingHistory::default())));

        let first = {
            let service = service.clone();
            thread::spawn(move || service.submit(Some("first.node"), sample_module(), &CancelToken::new()).unwrap())
        };
        thread::sleep(Duration::from_millis(100));
        service.submit(Some("second.node"), sample_module(), &CancelToken::new()).unwrap();
        first.join().unwrap();

        let newest = &service.history().list()[0];
        let latest = service.latest_report().unwrap();
        assert_eq!(service.history().len(), 2);
        assert_eq!(latest.record_id, newest.id);
        assert_eq!(latest.filename, newest.filename);
    }
}
