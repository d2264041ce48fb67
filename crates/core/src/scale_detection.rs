//! Drawing scale detection from text
//!
//! Parses drawing text to detect scale notations commonly found in title
//! blocks of architectural drawings.

use once_cell::sync::Lazy;
use regex::Regex;

/// Largest denominator accepted as a drawing scale
const MAX_DENOMINATOR: f64 = 10_000.0;

static RATIO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b1\s*[:/]\s*(\d+(?:\.\d+)?)").expect("ratio pattern is valid")
});

/// Keywords that mark a ratio as a scale notation
const SCALE_KEYWORDS: [&str; 4] = ["scale", "縮尺", "s=", "s ="];

/// A detected scale from drawing text
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedScale {
    /// Denominator N of the `1:N` notation
    pub denominator: f64,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Source text that was parsed
    pub source_text: String,
    /// Byte offset in the text where the notation starts
    pub text_offset: usize,
}

impl DetectedScale {
    pub fn new(
        denominator: f64,
        confidence: f32,
        source_text: impl Into<String>,
        text_offset: usize,
    ) -> Self {
        Self {
            denominator,
            confidence,
            source_text: source_text.into(),
            text_offset,
        }
    }

    /// Multiplier from drawing units to real-world units (0.01 for 1:100)
    pub fn factor(&self) -> f64 {
        1.0 / self.denominator
    }
}

/// Parse text to detect scale notations
///
/// Returns detected scales sorted by confidence (highest first), ties kept
/// in text order. Formats detected:
/// - "1:100", "1/50"
/// - "Scale 1:200", "SCALE: 1/100"
/// - "S=1/100", "縮尺 1/100"
pub fn detect_scales(text: &str) -> Vec<DetectedScale> {
    let mut detections = Vec::new();
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let line_lower = line.to_lowercase();
        let has_keyword = SCALE_KEYWORDS.iter().any(|k| line_lower.contains(k));

        for caps in RATIO_PATTERN.captures_iter(line) {
            let Ok(denominator) = caps[1].parse::<f64>() else {
                continue;
            };
            if denominator <= 0.0 || denominator > MAX_DENOMINATOR {
                continue;
            }

            let Some(whole) = caps.get(0) else {
                continue;
            };
            let confidence = if has_keyword { 0.9 } else { 0.7 };
            detections.push(DetectedScale::new(
                denominator,
                confidence,
                whole.as_str(),
                line_start + whole.start(),
            ));
        }

        line_start += line.len();
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    detections
}

/// Get the best (highest confidence) detected scale from text
pub fn best_scale(text: &str) -> Option<DetectedScale> {
    detect_scales(text).into_iter().next()
}
