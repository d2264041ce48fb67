//! Measurement ledger
//!
//! An append-only, ordered collection of measurements for one takeoff
//! session. Derived lengths, areas and perimeters are scaled by the drawing
//! scale; values scanned from text are taken as written.

use crate::csv_export::{self, CsvExportConfig};
use crate::json_export;
use crate::measurement::{
    LengthUnit, LineSegment, Measurement, MeasurementKind, MILLIMETERS, MM2_PER_M2,
};
use crate::scanner;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Error types for ledger export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format for [`Ledger::export`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Structured document with scale and summary metadata
    Json,
    /// One row per measurement
    Csv,
}

/// Ordered, append-only measurement collection
#[derive(Debug, Clone)]
pub struct Ledger {
    scale: f64,
    measurements: Vec<Measurement>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Ledger {
    /// Create an empty ledger for a drawing at `scale` (0.01 for 1:100)
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            measurements: Vec::new(),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// All measurements in insertion order
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Append an already-normalized measurement
    pub fn push(&mut self, measurement: Measurement) -> Measurement {
        self.measurements.push(measurement.clone());
        measurement
    }

    /// Append a batch produced elsewhere, keeping its order
    pub fn extend<I>(&mut self, measurements: I)
    where
        I: IntoIterator<Item = Measurement>,
    {
        self.measurements.extend(measurements);
    }

    /// Area of a `width` × `height` rectangle drawn at the ledger scale, in m²
    pub fn record_area(
        &mut self,
        width: f64,
        height: f64,
        unit: LengthUnit,
        label: &str,
    ) -> Measurement {
        let width_mm = unit.to_mm(width);
        let height_mm = unit.to_mm(height);
        let area_mm2 = width_mm * height_mm * (self.scale * self.scale);
        let area_m2 = area_mm2 / MM2_PER_M2;

        let label = if label.is_empty() {
            format!("{width_mm}×{height_mm}")
        } else {
            label.to_string()
        };

        self.push(
            Measurement::area(area_m2, label)
                .with_description(format!("width {width_mm}mm × height {height_mm}mm")),
        )
    }

    /// Perimeter of a `width` × `height` rectangle drawn at the ledger scale, in mm
    pub fn record_perimeter(
        &mut self,
        width: f64,
        height: f64,
        unit: LengthUnit,
        label: &str,
    ) -> Measurement {
        let width_mm = unit.to_mm(width);
        let height_mm = unit.to_mm(height);
        let perimeter = 2.0 * (width_mm + height_mm) * self.scale;

        let label = if label.is_empty() {
            format!("{width_mm}×{height_mm} perimeter")
        } else {
            label.to_string()
        };

        self.push(
            Measurement::perimeter(perimeter, label)
                .with_description(format!("(width {width_mm}mm + height {height_mm}mm) × 2")),
        )
    }

    pub fn record_count(
        &mut self,
        count: u64,
        label: &str,
        description: Option<&str>,
    ) -> Measurement {
        let mut measurement = Measurement::count(count, label);
        if let Some(description) = description {
            measurement = measurement.with_description(description);
        }
        self.push(measurement)
    }

    /// Length of a pixel segment on a raster drawing, in mm
    ///
    /// `pixels_per_mm` is the raster resolution on the drawing sheet; the
    /// ledger scale converts sheet millimeters to real ones.
    pub fn record_line_length(
        &mut self,
        segment: LineSegment,
        pixels_per_mm: f64,
        label: &str,
    ) -> Measurement {
        let pixel_length = segment.pixel_length();
        let length = (pixel_length / pixels_per_mm) * self.scale;

        let label = if label.is_empty() {
            format!(
                "Line ({},{})-({},{})",
                segment.x1, segment.y1, segment.x2, segment.y2
            )
        } else {
            label.to_string()
        };

        self.push(
            Measurement::length(length, label)
                .with_location(segment.start())
                .with_description(format!("{pixel_length:.1} px = {length:.1} {MILLIMETERS}")),
        )
    }

    /// Scan text for dimension tokens and append what was found
    pub fn scan_text(&mut self, text: &str) -> Vec<Measurement> {
        let found: Vec<Measurement> = scanner::scan(text).into_iter().collect();
        self.measurements.extend(found.iter().cloned());
        found
    }

    /// Group measurements by kind, keeping insertion order within each kind
    pub fn summarize(&self) -> Summary<'_> {
        let mut groups: BTreeMap<MeasurementKind, Vec<&Measurement>> = MeasurementKind::ALL
            .iter()
            .map(|kind| (*kind, Vec::new()))
            .collect();

        for measurement in &self.measurements {
            groups
                .entry(measurement.kind())
                .or_default()
                .push(measurement);
        }

        Summary { groups }
    }

    /// Number of measurements of each kind
    pub fn count_by_kind(&self) -> KindCounts {
        let mut counts = KindCounts::default();
        for measurement in &self.measurements {
            counts.increment(measurement.kind());
        }
        counts
    }

    /// Write all measurements to `destination` in `format`
    pub fn export(&self, format: ExportFormat, destination: &Path) -> ExportResult<()> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = BufWriter::new(File::create(destination)?);
        match format {
            ExportFormat::Json => json_export::export_json(writer, self)?,
            ExportFormat::Csv => {
                csv_export::export_csv(writer, self, &CsvExportConfig::default())?
            }
        }

        tracing::info!(
            path = %destination.display(),
            format = ?format,
            measurements = self.len(),
            "exported ledger"
        );
        Ok(())
    }

    /// Human-readable summary, grouped by kind
    pub fn report(&self) -> String {
        let mut out = String::new();
        let summary = self.summarize();

        for (kind, measurements) in summary.iter() {
            if measurements.is_empty() {
                continue;
            }
            let _ = writeln!(out, "[{kind}]");
            for m in measurements {
                let _ = writeln!(out, "  {}: {}", m.label(), m.formatted_value());
                if let Some(description) = m.description() {
                    let _ = writeln!(out, "    ({description})");
                }
            }
        }

        let _ = writeln!(out, "Total measurements: {}", self.len());
        out
    }
}

/// Measurements grouped by kind
///
/// Every kind has an entry, possibly empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary<'a> {
    groups: BTreeMap<MeasurementKind, Vec<&'a Measurement>>,
}

impl<'a> Summary<'a> {
    pub fn get(&self, kind: MeasurementKind) -> &[&'a Measurement] {
        self.groups.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Groups in kind order: length, area, count, perimeter
    pub fn iter(&self) -> impl Iterator<Item = (MeasurementKind, &[&'a Measurement])> {
        self.groups.iter().map(|(kind, group)| (*kind, group.as_slice()))
    }

    /// Sum of values for a kind, in its canonical unit
    pub fn total(&self, kind: MeasurementKind) -> f64 {
        self.get(kind).iter().map(|m| m.value()).sum()
    }
}

/// Per-kind measurement counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct KindCounts {
    pub length: usize,
    pub area: usize,
    pub count: usize,
    pub perimeter: usize,
}

impl KindCounts {
    fn increment(&mut self, kind: MeasurementKind) {
        match kind {
            MeasurementKind::Length => self.length += 1,
            MeasurementKind::Area => self.area += 1,
            MeasurementKind::Count => self.count += 1,
            MeasurementKind::Perimeter => self.perimeter += 1,
        }
    }

    pub fn get(&self, kind: MeasurementKind) -> usize {
        match kind {
            MeasurementKind::Length => self.length,
            MeasurementKind::Area => self.area,
            MeasurementKind::Count => self.count,
            MeasurementKind::Perimeter => self.perimeter,
        }
    }
}
