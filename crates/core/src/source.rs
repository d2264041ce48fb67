//! Text and line sources
//!
//! Sources are the external collaborators of a takeoff session: PDF text
//! extraction, OCR and line detection. Each is a capability injected into the
//! [`Extractor`](crate::extractor::Extractor) and probed once when injected.
//!
//! Failures are reported per unit of work (a page, an image) and never abort
//! the other units of the same source.

use crate::measurement::{LineSegment, Measurement};
use std::fs;
use std::path::{Path, PathBuf};

/// Error types for sources
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{0} is not available")]
    Unavailable(&'static str),

    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

impl SourceError {
    pub fn collaborator(collaborator: &'static str, message: impl ToString) -> Self {
        SourceError::Collaborator {
            collaborator,
            message: message.to_string(),
        }
    }
}

/// Text of one unit of work (a page or an image)
#[derive(Debug)]
pub struct TextUnit {
    /// Unit index, 0-based
    pub index: u32,
    /// Extracted text; `Ok(None)` when the unit has no text
    pub text: SourceResult<Option<String>>,
}

impl TextUnit {
    pub fn text(index: u32, text: impl Into<String>) -> Self {
        Self {
            index,
            text: Ok(Some(text.into())),
        }
    }

    pub fn empty(index: u32) -> Self {
        Self {
            index,
            text: Ok(None),
        }
    }

    pub fn failed(index: u32, error: SourceError) -> Self {
        Self {
            index,
            text: Err(error),
        }
    }
}

/// Supplies plain text for each unit of a file
pub trait TextSource {
    /// Name used in reports and logs
    fn name(&self) -> &'static str;

    /// Whether the backing library or tool can be used at all
    fn probe(&self) -> bool;

    /// Read every unit of `path`
    ///
    /// An error here means the whole file could not be read; per-unit
    /// failures are carried in [`TextUnit::text`].
    fn read_units(&self, path: &Path) -> SourceResult<Vec<TextUnit>>;
}

/// Supplies straight line segments found on a raster drawing
pub trait LineDetector {
    fn name(&self) -> &'static str;

    fn probe(&self) -> bool {
        true
    }

    /// Detect lines in the image at `path`, `threshold` being the minimum
    /// vote count for a line
    fn detect_lines(&self, path: &Path, threshold: u32) -> SourceResult<Vec<LineSegment>>;
}

/// Reads a UTF-8 text file as a single unit
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn name(&self) -> &'static str {
        "text file reader"
    }

    fn probe(&self) -> bool {
        true
    }

    fn read_units(&self, path: &Path) -> SourceResult<Vec<TextUnit>> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(vec![TextUnit::text(0, text)])
    }
}

/// Overall status of one source file
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    /// The source was read; see the unit reports
    Processed,
    /// The collaborator needed for this source is missing
    Unavailable { collaborator: &'static str },
    /// The file does not exist
    NotFound,
    /// The collaborator could not read the file at all
    Failed { message: String },
}

/// Outcome of one unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum UnitResult {
    Measured(Vec<Measurement>),
    Empty,
    Failed(String),
}

impl UnitResult {
    pub fn measurements(&self) -> &[Measurement] {
        match self {
            UnitResult::Measured(measurements) => measurements,
            UnitResult::Empty | UnitResult::Failed(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub index: u32,
    pub result: UnitResult,
}

/// Structured result of reading one file into the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub path: PathBuf,
    pub status: SourceStatus,
    pub units: Vec<UnitReport>,
}

impl SourceReport {
    pub fn processed(path: &Path, units: Vec<UnitReport>) -> Self {
        Self {
            path: path.to_path_buf(),
            status: SourceStatus::Processed,
            units,
        }
    }

    pub fn unavailable(path: &Path, collaborator: &'static str) -> Self {
        Self::without_units(path, SourceStatus::Unavailable { collaborator })
    }

    pub fn not_found(path: &Path) -> Self {
        Self::without_units(path, SourceStatus::NotFound)
    }

    pub fn failed(path: &Path, message: impl Into<String>) -> Self {
        Self::without_units(
            path,
            SourceStatus::Failed {
                message: message.into(),
            },
        )
    }

    fn without_units(path: &Path, status: SourceStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            units: Vec::new(),
        }
    }

    /// Measurements produced by all units, in unit order
    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.units.iter().flat_map(|unit| unit.result.measurements())
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements().count()
    }

    pub fn failed_units(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|unit| matches!(unit.result, UnitResult::Failed(_)))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, SourceStatus::Unavailable { .. })
    }

    /// One-line description for logs and CLI output
    pub fn summary_line(&self) -> String {
        let path = self.path.display();
        match &self.status {
            SourceStatus::Processed => {
                let failed = self.failed_units().count();
                let mut line = format!(
                    "{path}: {} measurement(s) from {} unit(s)",
                    self.measurement_count(),
                    self.units.len()
                );
                if failed > 0 {
                    line.push_str(&format!(", {failed} unit(s) failed"));
                }
                line
            }
            SourceStatus::Unavailable { collaborator } => {
                format!("{path}: skipped, {collaborator} is not available")
            }
            SourceStatus::NotFound => format!("{path}: file does not exist"),
            SourceStatus::Failed { message } => format!("{path}: failed: {message}"),
        }
    }
}
