//! Takeoff session
//!
//! An [`Extractor`] owns the ledger for one drawing set together with the
//! optional sources that feed it. Each source is probed once when it is
//! attached and the result is cached for the lifetime of the session.
//!
//! Sources are processed one file at a time, units in order, and their
//! measurements are appended to the ledger in that order.

use crate::ledger::Ledger;
use crate::measurement::{LengthUnit, Measurement};
use crate::ocr::{OcrConfig, TesseractOcr};
use crate::scale_detection::{best_scale, DetectedScale};
use crate::source::{
    LineDetector, PlainTextSource, SourceError, SourceReport, TextSource, UnitReport, UnitResult,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Extensions handled by the OCR source
pub const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// Configuration for a takeoff session
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Drawing scale (0.01 for 1:100)
    pub scale: f64,

    /// OCR settings used by the default image source
    pub ocr: OcrConfig,

    /// Minimum vote count passed to the line detector
    pub line_threshold: u32,

    /// Raster resolution used when converting detected lines to lengths
    pub pixels_per_mm: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            ocr: OcrConfig::default(),
            line_threshold: 100,
            pixels_per_mm: 1.0,
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_ocr(mut self, ocr: OcrConfig) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn with_line_threshold(mut self, threshold: u32) -> Self {
        self.line_threshold = threshold;
        self
    }

    pub fn with_pixels_per_mm(mut self, pixels_per_mm: f64) -> Self {
        self.pixels_per_mm = pixels_per_mm;
        self
    }
}

/// Kind of file a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Image,
    Text,
}

impl SourceKind {
    /// Classify a path by extension; unknown extensions are read as text
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => SourceKind::Pdf,
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => SourceKind::Image,
            _ => SourceKind::Text,
        }
    }
}

/// Cached availability of the optional capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub pdf: bool,
    pub ocr: bool,
    pub line_detection: bool,
}

struct Attached<T: ?Sized> {
    provider: Box<T>,
    available: bool,
}

impl<T: ?Sized> Attached<T> {
    fn usable(slot: &Option<Attached<T>>) -> Option<&T> {
        slot.as_ref()
            .filter(|attached| attached.available)
            .map(|attached| attached.provider.as_ref())
    }
}

/// One takeoff session: a ledger plus its sources
pub struct Extractor {
    config: ExtractorConfig,
    ledger: Ledger,
    text: PlainTextSource,
    pdf: Option<Attached<dyn TextSource>>,
    ocr: Option<Attached<dyn TextSource>>,
    lines: Option<Attached<dyn LineDetector>>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl Extractor {
    /// A session with no optional sources attached
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            ledger: Ledger::new(config.scale),
            config,
            text: PlainTextSource,
            pdf: None,
            ocr: None,
            lines: None,
        }
    }

    /// A session with the built-in PDF reader and Tesseract OCR attached
    pub fn with_default_sources(config: ExtractorConfig) -> Self {
        let ocr = TesseractOcr::new(config.ocr.clone());
        let extractor = Self::new(config);

        #[cfg(feature = "pdf")]
        let extractor = extractor.with_pdf_source(crate::pdf_source::PdfTextSource::new());

        extractor.with_ocr_source(ocr)
    }

    pub fn with_pdf_source(mut self, source: impl TextSource + 'static) -> Self {
        self.pdf = Some(attach(Box::new(source)));
        self
    }

    pub fn with_ocr_source(mut self, source: impl TextSource + 'static) -> Self {
        self.ocr = Some(attach(Box::new(source)));
        self
    }

    pub fn with_line_detector(mut self, detector: impl LineDetector + 'static) -> Self {
        let provider: Box<dyn LineDetector> = Box::new(detector);
        let available = provider.probe();
        if !available {
            warn!(collaborator = provider.name(), "line detector is not available");
        }
        self.lines = Some(Attached {
            provider,
            available,
        });
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            pdf: Attached::usable(&self.pdf).is_some(),
            ocr: Attached::usable(&self.ocr).is_some(),
            line_detection: Attached::usable(&self.lines).is_some(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// Change the drawing scale while nothing has been recorded yet
    ///
    /// Returns `false` and leaves the scale unchanged once the ledger holds
    /// measurements.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        if !self.ledger.is_empty() {
            return false;
        }
        self.config.scale = scale;
        self.ledger = Ledger::new(scale);
        true
    }

    pub fn scan_text(&mut self, text: &str) -> Vec<Measurement> {
        self.ledger.scan_text(text)
    }

    pub fn record_area(
        &mut self,
        width: f64,
        height: f64,
        unit: LengthUnit,
        label: &str,
    ) -> Measurement {
        self.ledger.record_area(width, height, unit, label)
    }

    pub fn record_perimeter(
        &mut self,
        width: f64,
        height: f64,
        unit: LengthUnit,
        label: &str,
    ) -> Measurement {
        self.ledger.record_perimeter(width, height, unit, label)
    }

    pub fn record_count(
        &mut self,
        count: u64,
        label: &str,
        description: Option<&str>,
    ) -> Measurement {
        self.ledger.record_count(count, label, description)
    }

    /// Read a file with the source matching its extension
    pub fn extract_from_path(&mut self, path: &Path) -> SourceReport {
        match SourceKind::from_path(path) {
            SourceKind::Pdf => self.extract_from_pdf(path),
            SourceKind::Image => self.extract_from_image(path),
            SourceKind::Text => self.extract_from_text_file(path),
        }
    }

    pub fn extract_from_text_file(&mut self, path: &Path) -> SourceReport {
        let source = self.text;
        extract_units(&mut self.ledger, &source, path)
    }

    pub fn extract_from_pdf(&mut self, path: &Path) -> SourceReport {
        match Attached::usable(&self.pdf) {
            Some(source) => extract_units(&mut self.ledger, source, path),
            None => unavailable(path, "PDF reader"),
        }
    }

    pub fn extract_from_image(&mut self, path: &Path) -> SourceReport {
        match Attached::usable(&self.ocr) {
            Some(source) => extract_units(&mut self.ledger, source, path),
            None => unavailable(path, "OCR"),
        }
    }

    /// Detect lines on a raster drawing and record each as a length
    pub fn measure_lines(&mut self, path: &Path) -> SourceReport {
        let Some(detector) = Attached::usable(&self.lines) else {
            return unavailable(path, "line detector");
        };
        if !path.exists() {
            return not_found(path);
        }

        let segments = match detector.detect_lines(path, self.config.line_threshold) {
            Ok(segments) => segments,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "line detection failed");
                return SourceReport::failed(path, err.to_string());
            }
        };

        let result = if segments.is_empty() {
            UnitResult::Empty
        } else {
            let measurements = segments
                .into_iter()
                .map(|segment| {
                    self.ledger
                        .record_line_length(segment, self.config.pixels_per_mm, "")
                })
                .collect();
            UnitResult::Measured(measurements)
        };

        let report = SourceReport::processed(path, vec![UnitReport { index: 0, result }]);
        info!(path = %path.display(), measurements = report.measurement_count(), "measured lines");
        report
    }

    /// Read the text of a file without recording anything
    pub fn read_text(&self, path: &Path) -> Result<String, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let source: &dyn TextSource = match SourceKind::from_path(path) {
            SourceKind::Pdf => {
                Attached::usable(&self.pdf).ok_or(SourceError::Unavailable("PDF reader"))?
            }
            SourceKind::Image => {
                Attached::usable(&self.ocr).ok_or(SourceError::Unavailable("OCR"))?
            }
            SourceKind::Text => &self.text,
        };

        let mut text = String::new();
        for unit in source.read_units(path)? {
            if let Ok(Some(unit_text)) = unit.text {
                text.push_str(&unit_text);
                text.push('\n');
            }
        }
        Ok(text)
    }

    /// Detect the drawing scale from a file's text
    pub fn detect_scale(&self, path: &Path) -> Result<Option<DetectedScale>, SourceError> {
        Ok(best_scale(&self.read_text(path)?))
    }
}

fn attach(provider: Box<dyn TextSource>) -> Attached<dyn TextSource> {
    let available = provider.probe();
    if available {
        debug!(collaborator = provider.name(), "source available");
    } else {
        warn!(collaborator = provider.name(), "source is not available");
    }
    Attached {
        provider,
        available,
    }
}

fn unavailable(path: &Path, collaborator: &'static str) -> SourceReport {
    warn!(path = %path.display(), collaborator, "skipping source, collaborator unavailable");
    SourceReport::unavailable(path, collaborator)
}

fn not_found(path: &Path) -> SourceReport {
    warn!(path = %path.display(), "file does not exist");
    SourceReport::not_found(path)
}

fn extract_units(ledger: &mut Ledger, source: &dyn TextSource, path: &Path) -> SourceReport {
    if !path.exists() {
        return not_found(path);
    }

    let units = match source.read_units(path) {
        Ok(units) => units,
        Err(err) => {
            warn!(
                path = %path.display(),
                collaborator = source.name(),
                error = %err,
                "source failed"
            );
            return SourceReport::failed(path, err.to_string());
        }
    };

    let reports = units
        .into_iter()
        .map(|unit| {
            let result = match unit.text {
                Ok(Some(text)) => {
                    let found = ledger.scan_text(&text);
                    debug!(unit = unit.index, measurements = found.len(), "scanned unit");
                    if found.is_empty() {
                        UnitResult::Empty
                    } else {
                        UnitResult::Measured(found)
                    }
                }
                Ok(None) => UnitResult::Empty,
                Err(err) => {
                    warn!(unit = unit.index, error = %err, "unit failed");
                    UnitResult::Failed(err.to_string())
                }
            };
            UnitReport {
                index: unit.index,
                result,
            }
        })
        .collect();

    let report = SourceReport::processed(path, reports);
    info!(
        path = %path.display(),
        collaborator = source.name(),
        measurements = report.measurement_count(),
        "processed source"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{LineSegment, MeasurementKind};
    use crate::source::{SourceResult, SourceStatus, TextUnit};
    use std::path::PathBuf;

    /// Text source returning fixed units
    struct FakeSource {
        available: bool,
        pages: Vec<Option<&'static str>>,
        fail_page: Option<u32>,
    }

    impl FakeSource {
        fn pages(pages: Vec<Option<&'static str>>) -> Self {
            Self {
                available: true,
                pages,
                fail_page: None,
            }
        }
    }

    impl TextSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn probe(&self) -> bool {
            self.available
        }

        fn read_units(&self, _path: &Path) -> SourceResult<Vec<TextUnit>> {
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(i, page)| {
                    let index = i as u32;
                    if self.fail_page == Some(index) {
                        TextUnit::failed(index, SourceError::collaborator("fake", "boom"))
                    } else {
                        match page {
                            Some(text) => TextUnit::text(index, *text),
                            None => TextUnit::empty(index),
                        }
                    }
                })
                .collect())
        }
    }

    struct BrokenSource;

    impl TextSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn probe(&self) -> bool {
            true
        }

        fn read_units(&self, _path: &Path) -> SourceResult<Vec<TextUnit>> {
            Err(SourceError::collaborator("broken", "cannot open"))
        }
    }

    struct FakeDetector(Vec<LineSegment>);

    impl LineDetector for FakeDetector {
        fn name(&self) -> &'static str {
            "fake detector"
        }

        fn detect_lines(&self, _path: &Path, threshold: u32) -> SourceResult<Vec<LineSegment>> {
            assert_eq!(threshold, 100);
            Ok(self.0.clone())
        }
    }

    fn existing_file(extension: &str) -> tempfile::NamedTempFile {
        tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap()
    }

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(SourceKind::from_path(Path::new("a.PDF")), SourceKind::Pdf);
        assert_eq!(SourceKind::from_path(Path::new("a.png")), SourceKind::Image);
        assert_eq!(SourceKind::from_path(Path::new("a.jpeg")), SourceKind::Image);
        assert_eq!(SourceKind::from_path(Path::new("notes.txt")), SourceKind::Text);
        assert_eq!(SourceKind::from_path(Path::new("README")), SourceKind::Text);
    }

    #[test]
    fn test_capabilities_probed_once_at_attach() {
        let extractor = Extractor::new(ExtractorConfig::default())
            .with_pdf_source(FakeSource::pages(vec![]))
            .with_ocr_source(FakeSource {
                available: false,
                pages: vec![],
                fail_page: None,
            });

        assert_eq!(
            extractor.capabilities(),
            Capabilities {
                pdf: true,
                ocr: false,
                line_detection: false,
            }
        );
    }

    #[test]
    fn test_pdf_pages_scanned_in_order() {
        let file = existing_file(".pdf");
        let mut extractor = Extractor::new(ExtractorConfig::new().with_scale(0.01))
            .with_pdf_source(FakeSource::pages(vec![
                Some("開口部: 800mm"),
                None,
                Some("居室: 15.5㎡ 天井高: 2,400mm"),
            ]));

        let report = extractor.extract_from_pdf(file.path());
        assert_eq!(report.status, SourceStatus::Processed);
        assert_eq!(report.units.len(), 3);
        assert_eq!(report.units[1].result, UnitResult::Empty);

        let values: Vec<f64> =
            extractor.ledger().measurements().iter().map(|m| m.value()).collect();
        assert_eq!(values, vec![800.0, 2400.0, 15.5]);
        assert_eq!(report.measurement_count(), 3);
    }

    #[test]
    fn test_failed_page_does_not_abort_others() {
        let file = existing_file(".pdf");
        let mut source = FakeSource::pages(vec![Some("1m"), Some("2m"), Some("3m")]);
        source.fail_page = Some(1);
        let mut extractor = Extractor::new(ExtractorConfig::default()).with_pdf_source(source);

        let report = extractor.extract_from_pdf(file.path());
        assert_eq!(report.failed_units().count(), 1);
        assert_eq!(report.measurement_count(), 2);
        assert_eq!(extractor.ledger().len(), 2);
        assert!(matches!(
            report.units[1].result,
            UnitResult::Failed(ref msg) if msg.contains("boom")
        ));
    }

    #[test]
    fn test_unavailable_source_reported() {
        let file = existing_file(".png");
        let mut extractor = Extractor::new(ExtractorConfig::default());

        let report = extractor.extract_from_image(file.path());
        assert!(report.is_unavailable());
        assert_eq!(report.status, SourceStatus::Unavailable { collaborator: "OCR" });
        assert!(extractor.ledger().is_empty());
    }

    #[test]
    fn test_probe_failure_makes_source_unavailable() {
        let file = existing_file(".png");
        let mut extractor = Extractor::new(ExtractorConfig::default()).with_ocr_source(FakeSource {
            available: false,
            pages: vec![Some("800mm")],
            fail_page: None,
        });

        let report = extractor.extract_from_image(file.path());
        assert!(report.is_unavailable());
        assert!(extractor.ledger().is_empty());
    }

    #[test]
    fn test_missing_file_reported_before_extraction() {
        let mut extractor = Extractor::new(ExtractorConfig::default())
            .with_pdf_source(BrokenSource);

        let report = extractor.extract_from_pdf(Path::new("/no/such/plan.pdf"));
        assert_eq!(report.status, SourceStatus::NotFound);
        assert!(report.units.is_empty());
    }

    #[test]
    fn test_collaborator_failure_reported() {
        let file = existing_file(".pdf");
        let mut extractor =
            Extractor::new(ExtractorConfig::default()).with_pdf_source(BrokenSource);

        let report = extractor.extract_from_pdf(file.path());
        assert_eq!(
            report.status,
            SourceStatus::Failed {
                message: "broken failed: cannot open".to_string()
            }
        );
        assert!(extractor.ledger().is_empty());
    }

    #[test]
    fn test_text_file_extraction() {
        let file = existing_file(".txt");
        std::fs::write(file.path(), "寸法: 3,500mm × 4,500mm\n居室: 15.5㎡\n").unwrap();
        let mut extractor = Extractor::new(ExtractorConfig::default());

        let report = extractor.extract_from_path(file.path());
        assert_eq!(report.measurement_count(), 3);
        assert_eq!(extractor.ledger().len(), 3);
    }

    #[test]
    fn test_empty_text_is_not_an_error() {
        let file = existing_file(".txt");
        let mut extractor = Extractor::new(ExtractorConfig::default());

        let report = extractor.extract_from_text_file(file.path());
        assert_eq!(report.status, SourceStatus::Processed);
        assert_eq!(report.units[0].result, UnitResult::Empty);
    }

    #[test]
    fn test_measure_lines() {
        let file = existing_file(".png");
        let mut extractor = Extractor::new(
            ExtractorConfig::new().with_scale(0.01).with_pixels_per_mm(10.0),
        )
        .with_line_detector(FakeDetector(vec![
            LineSegment::new(100, 100, 500, 100),
            LineSegment::new(0, 0, 0, 50),
        ]));

        assert!(extractor.capabilities().line_detection);
        let report = extractor.measure_lines(file.path());
        assert_eq!(report.measurement_count(), 2);

        let first = &extractor.ledger().measurements()[0];
        assert_eq!(first.kind(), MeasurementKind::Length);
        assert_eq!(first.value(), (400.0 / 10.0) * 0.01);
        assert_eq!(first.label(), "Line (100,100)-(500,100)");
    }

    #[test]
    fn test_measure_lines_without_detector() {
        let mut extractor = Extractor::new(ExtractorConfig::default());
        let report = extractor.measure_lines(Path::new("plan.png"));
        assert_eq!(
            report.status,
            SourceStatus::Unavailable {
                collaborator: "line detector"
            }
        );
    }

    #[test]
    fn test_sources_concatenate_in_call_order() {
        let first = existing_file(".txt");
        let second = existing_file(".txt");
        std::fs::write(first.path(), "1m 2m").unwrap();
        std::fs::write(second.path(), "3m").unwrap();
        let mut extractor = Extractor::new(ExtractorConfig::default());

        extractor.extract_from_path(second.path());
        extractor.extract_from_path(first.path());

        let values: Vec<f64> =
            extractor.ledger().measurements().iter().map(|m| m.value()).collect();
        assert_eq!(values, vec![3000.0, 1000.0, 2000.0]);
    }

    #[test]
    fn test_detect_scale_and_set_scale() {
        let file = existing_file(".txt");
        std::fs::write(file.path(), "平面図 S=1/100\n開口部: 800mm").unwrap();
        let mut extractor = Extractor::new(ExtractorConfig::default());

        let detected = extractor.detect_scale(file.path()).unwrap().unwrap();
        assert_eq!(detected.factor(), 0.01);
        assert!(extractor.ledger().is_empty());

        assert!(extractor.set_scale(detected.factor()));
        assert_eq!(extractor.ledger().scale(), 0.01);

        extractor.record_count(1, "door", None);
        assert!(!extractor.set_scale(1.0));
        assert_eq!(extractor.ledger().scale(), 0.01);
    }

    #[test]
    fn test_read_text_missing_file() {
        let extractor = Extractor::new(ExtractorConfig::default());
        let err = extractor.read_text(&PathBuf::from("/no/such/notes.txt")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn test_manual_records_use_session_scale() {
        let mut extractor = Extractor::new(ExtractorConfig::new().with_scale(0.01));
        let area = extractor.record_area(3500.0, 4500.0, LengthUnit::Millimeter, "room");
        let perimeter = extractor.record_perimeter(3500.0, 4500.0, LengthUnit::Millimeter, "room");

        assert_eq!(area.value(), 3500.0 * 4500.0 * (0.01 * 0.01) / 1_000_000.0);
        assert_eq!(perimeter.value(), 160.0);
        assert_eq!(extractor.into_ledger().len(), 2);
    }
}
