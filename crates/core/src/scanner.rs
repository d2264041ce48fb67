//! Dimension token scanner
//!
//! Finds length and area tokens in free text (drawing notes, extracted PDF
//! text, OCR output) and normalizes them to canonical units.
//!
//! Recognized forms:
//! - lengths: `800mm`, `250 cm`, `3,500mm`, `2.4m`
//! - areas: `15.5㎡`, `15.5m2`, `15.5 m²`
//!
//! A length unit directly followed by `²` or a digit is not a length, which
//! keeps `15.5m2` an area. Letters may follow a unit, so run-together
//! notation such as `3500mmx4500mm` or `W800mmH2000mm` still yields lengths.
//!
//! A token never starts in the middle of a number: `1,5m` is read whole as
//! 15 m, never as `5m`.

use crate::measurement::{LengthUnit, Measurement, MeasurementKind};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::iter::FusedIterator;

const NUMBER: &str = r"(\d+(?:,\d+)*(?:\.\d+)?)";

static LENGTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{NUMBER}\s*(mm|cm|m)")).expect("length pattern is valid")
});

static AREA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"{NUMBER}\s*(㎡|m2|m²)")).expect("area pattern is valid"));

/// Scan `text` for dimension tokens
///
/// Lengths come first in order of occurrence, then areas in order of
/// occurrence. Nothing is evaluated until the result is iterated, and the
/// result can be iterated any number of times.
pub fn scan(text: &str) -> Scan<'_> {
    Scan { text }
}

/// Lazily evaluated scan result over a borrowed text
#[derive(Debug, Clone, Copy)]
pub struct Scan<'t> {
    text: &'t str,
}

impl<'t> Scan<'t> {
    /// Start a fresh pass over the text
    pub fn iter(&self) -> ScanIter<'t> {
        ScanIter {
            text: self.text,
            lengths: Some(LENGTH_PATTERN.captures_iter(self.text)),
            areas: AREA_PATTERN.captures_iter(self.text),
        }
    }

    /// The text being scanned
    pub fn text(&self) -> &'t str {
        self.text
    }
}

impl<'t> IntoIterator for Scan<'t> {
    type Item = Measurement;
    type IntoIter = ScanIter<'t>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 't> IntoIterator for &'a Scan<'t> {
    type Item = Measurement;
    type IntoIter = ScanIter<'t>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the measurements of one scan pass
#[derive(Debug)]
pub struct ScanIter<'t> {
    text: &'t str,
    lengths: Option<regex::CaptureMatches<'static, 't>>,
    areas: regex::CaptureMatches<'static, 't>,
}

impl Iterator for ScanIter<'_> {
    type Item = Measurement;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(lengths) = self.lengths.as_mut() {
            for caps in lengths.by_ref() {
                if let Some(measurement) = length_from(self.text, &caps) {
                    return Some(measurement);
                }
            }
            self.lengths = None;
        }

        self.areas
            .by_ref()
            .find_map(|caps| area_from(self.text, &caps))
    }
}

impl FusedIterator for ScanIter<'_> {}

fn length_from(text: &str, caps: &Captures<'_>) -> Option<Measurement> {
    let whole = caps.get(0)?;
    if !at_number_start(&text[..whole.start()]) || !at_unit_boundary(&text[whole.end()..]) {
        return None;
    }

    let number = caps.get(1)?.as_str();
    let symbol = caps.get(2)?.as_str();
    let unit: LengthUnit = symbol.parse().ok()?;
    let value = parse_number(number)?;

    Some(Measurement::new(
        MeasurementKind::Length,
        unit.to_mm(value),
        format!("{number}{symbol}"),
    ))
}

fn area_from(text: &str, caps: &Captures<'_>) -> Option<Measurement> {
    let whole = caps.get(0)?;
    if !at_number_start(&text[..whole.start()]) {
        return None;
    }

    let number = caps.get(1)?.as_str();
    let symbol = caps.get(2)?.as_str();
    let value = parse_number(number)?;

    Some(Measurement::new(
        MeasurementKind::Area,
        value,
        format!("{number}{symbol}"),
    ))
}

/// True when a number may start right after `before`
///
/// Rejects a digit, and a separator that itself follows a digit.
fn at_number_start(before: &str) -> bool {
    let mut chars = before.chars().rev();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_digit() => false,
        Some(',' | '.') => !chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    }
}

/// True when a length unit may end right before `rest`
fn at_unit_boundary(rest: &str) -> bool {
    match rest.chars().next() {
        Some('²') => false,
        Some(c) => !c.is_ascii_digit(),
        None => true,
    }
}

/// Parse a numeric token after stripping thousands separators
fn parse_number(token: &str) -> Option<f64> {
    token.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str) -> Vec<(MeasurementKind, f64, String)> {
        scan(text)
            .iter()
            .map(|m| (m.kind(), m.value(), m.unit().to_string()))
            .collect()
    }

    #[test]
    fn test_meters_normalize_to_millimeters() {
        assert_eq!(values("5m"), vec![(MeasurementKind::Length, 5000.0, "mm".into())]);
    }

    #[test]
    fn test_centimeters_normalize_to_millimeters() {
        assert_eq!(values("250cm"), vec![(MeasurementKind::Length, 2500.0, "mm".into())]);
    }

    #[test]
    fn test_millimeters_unchanged() {
        assert_eq!(values("800mm"), vec![(MeasurementKind::Length, 800.0, "mm".into())]);
    }

    #[test]
    fn test_square_meter_symbol() {
        assert_eq!(values("15.5㎡"), vec![(MeasurementKind::Area, 15.5, "m²".into())]);
    }

    #[test]
    fn test_area_spellings() {
        let found = values("A 12m2 B 3.5 m² C 20㎡");
        assert_eq!(
            found,
            vec![
                (MeasurementKind::Area, 12.0, "m²".into()),
                (MeasurementKind::Area, 3.5, "m²".into()),
                (MeasurementKind::Area, 20.0, "m²".into()),
            ]
        );
    }

    #[test]
    fn test_area_token_is_not_a_length() {
        let found: Vec<Measurement> = scan("15.5m2").iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind(), MeasurementKind::Area);
        assert_eq!(found[0].value(), 15.5);
        assert_eq!(found[0].label(), "15.5m2");

        let superscript: Vec<Measurement> = scan("15.5m²").iter().collect();
        assert_eq!(superscript.len(), 1);
        assert_eq!(superscript[0].kind(), MeasurementKind::Area);
    }

    #[test]
    fn test_thousands_separator_stripped() {
        let found: Vec<Measurement> = scan("寸法: 3,500mm × 4,500mm").iter().collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value(), 3500.0);
        assert_eq!(found[0].label(), "3,500mm");
        assert_eq!(found[1].value(), 4500.0);
    }

    #[test]
    fn test_whitespace_between_number_and_unit() {
        let found: Vec<Measurement> = scan("opening 2.4 m wide").iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value(), 2400.0);
        assert_eq!(found[0].label(), "2.4m");
    }

    #[test]
    fn test_run_together_dimensions() {
        let found: Vec<Measurement> = scan("3500mmx4500mm").iter().collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value(), 3500.0);
        assert_eq!(found[0].label(), "3500mm");
        assert_eq!(found[1].value(), 4500.0);

        let labels: Vec<String> = scan("W800mmH2000mm")
            .iter()
            .map(|m| m.label().to_string())
            .collect();
        assert_eq!(labels, vec!["800mm", "2000mm"]);

        assert_eq!(values("pipe 100mmL"), vec![(MeasurementKind::Length, 100.0, "mm".into())]);
    }

    #[test]
    fn test_separator_grouping_read_whole() {
        let found: Vec<Measurement> = scan("1,5m").iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value(), 15000.0);
        assert_eq!(found[0].label(), "1,5m");
    }

    #[test]
    fn test_token_never_starts_mid_number() {
        assert!(values("1.2.3m").is_empty());
        assert!(values("4.5.6㎡").is_empty());
        assert_eq!(values("door,800mm"), vec![(MeasurementKind::Length, 800.0, "mm".into())]);
    }

    #[test]
    fn test_lengths_before_areas() {
        let found = values("room 15.5㎡, door 800mm, window 1.2m");
        let kinds: Vec<MeasurementKind> = found.iter().map(|(k, _, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![MeasurementKind::Length, MeasurementKind::Length, MeasurementKind::Area]
        );
        assert_eq!(found[0].1, 800.0);
        assert_eq!(found[1].1, 1200.0);
    }

    #[test]
    fn test_scan_is_restartable() {
        let result = scan("800mm 15.5㎡");
        let first: Vec<Measurement> = result.iter().collect();
        let second: Vec<Measurement> = result.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_scanned_fields() {
        let found: Vec<Measurement> = scan("2,400mm").iter().collect();
        assert_eq!(found[0].label(), "2,400mm");
        assert!(found[0].location().is_none());
        assert!(found[0].description().is_none());
    }

    #[test]
    fn test_empty_and_tokenless_text() {
        assert_eq!(scan("").iter().count(), 0);
        assert_eq!(scan("no dimensions here").iter().count(), 0);
        assert_eq!(scan("Scale 1:100").iter().count(), 0);
    }

    #[test]
    fn test_unit_boundary() {
        assert!(at_unit_boundary(""));
        assert!(at_unit_boundary(" x"));
        assert!(at_unit_boundary("×"));
        assert!(at_unit_boundary("幅"));
        assert!(!at_unit_boundary("2"));
        assert!(!at_unit_boundary("²"));
        assert!(at_unit_boundary("x4500mm"));
    }

    #[test]
    fn test_number_start() {
        assert!(at_number_start(""));
        assert!(at_number_start("door "));
        assert!(at_number_start("door,"));
        assert!(!at_number_start("1"));
        assert!(!at_number_start("1,"));
        assert!(!at_number_start("2."));
    }
}
