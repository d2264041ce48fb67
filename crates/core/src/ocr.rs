//! OCR text source for raster drawings
//!
//! Runs the Tesseract command-line tool on an image and returns its text.
//! The tool is located once, when the source is probed; a missing tool is
//! reported as an unavailable capability rather than an error.

use crate::source::{SourceError, SourceResult, TextSource, TextUnit};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

/// Environment variable overriding the Tesseract executable
pub const TESSERACT_BIN_ENV: &str = "TAKEOFF_TESSERACT_BIN";

const NAME: &str = "OCR (tesseract)";

/// OCR engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    /// Tesseract executable name or path
    pub binary: OsString,

    /// Languages to use for OCR (e.g., "jpn+eng")
    pub language: String,

    /// OCR engine mode (0=Original, 1=Neural nets LSTM, 2=Legacy+LSTM, 3=Default)
    pub engine_mode: u8,

    /// Page segmentation mode (3=Auto, 6=Single uniform block, etc.)
    pub page_segmentation_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: std::env::var_os(TESSERACT_BIN_ENV)
                .unwrap_or_else(|| OsString::from("tesseract")),
            language: "jpn+eng".to_string(),
            engine_mode: 3,
            page_segmentation_mode: 6,
        }
    }
}

impl OcrConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<OsString>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_engine_mode(mut self, mode: u8) -> Self {
        self.engine_mode = mode;
        self
    }

    pub fn with_page_segmentation_mode(mut self, mode: u8) -> Self {
        self.page_segmentation_mode = mode;
        self
    }
}

/// Image text source using the Tesseract CLI
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.binary);
        command.stdin(Stdio::null());
        command
    }
}

impl TextSource for TesseractOcr {
    fn name(&self) -> &'static str {
        NAME
    }

    fn probe(&self) -> bool {
        let status = self
            .command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::debug!(binary = ?self.config.binary, error = %err, "tesseract not found");
                false
            }
        }
    }

    fn read_units(&self, path: &Path) -> SourceResult<Vec<TextUnit>> {
        let output = self
            .command()
            .arg(path)
            .arg("stdout")
            .args(["--oem", &self.config.engine_mode.to_string()])
            .args(["--psm", &self.config.page_segmentation_mode.to_string()])
            .args(["-l", &self.config.language])
            .output()
            .map_err(|err| SourceError::collaborator(NAME, err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(vec![TextUnit::failed(
                0,
                SourceError::collaborator(
                    NAME,
                    format!("exited with {}: {}", output.status, stderr.trim()),
                ),
            )]);
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            Ok(vec![TextUnit::empty(0)])
        } else {
            Ok(vec![TextUnit::text(0, text)])
        }
    }
}
