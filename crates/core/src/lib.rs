//! Drawing takeoff core library
//!
//! Measurement extraction from construction drawings: unit-normalizing text
//! scanning, a per-session measurement ledger, and export to JSON and CSV.

pub mod csv_export;
pub mod extractor;
pub mod json_export;
pub mod ledger;
pub mod measurement;
pub mod ocr;
#[cfg(feature = "pdf")]
pub mod pdf_source;
pub mod scale_detection;
pub mod scanner;
pub mod source;

pub use csv_export::{export_csv, CsvExportConfig};
pub use extractor::{Capabilities, Extractor, ExtractorConfig, SourceKind};
pub use json_export::export_json;
pub use ledger::{ExportError, ExportFormat, ExportResult, KindCounts, Ledger, Summary};
pub use measurement::{
    LengthUnit, LineSegment, Measurement, MeasurementKind, PlanCoordinate, UnitParseError,
};
pub use ocr::{OcrConfig, TesseractOcr, TESSERACT_BIN_ENV};
#[cfg(feature = "pdf")]
pub use pdf_source::PdfTextSource;
pub use scale_detection::{best_scale, detect_scales, DetectedScale};
pub use scanner::{scan, Scan};
pub use source::{
    LineDetector, PlainTextSource, SourceError, SourceReport, SourceResult, SourceStatus,
    TextSource, TextUnit, UnitReport, UnitResult,
};
