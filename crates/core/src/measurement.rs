//! Measurement records and canonical units
//!
//! Every measurement is stored in the canonical unit for its kind:
//! millimeters for lengths and perimeters, square meters for areas and a
//! plain quantity for counts.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Canonical unit label for lengths and perimeters
pub const MILLIMETERS: &str = "mm";

/// Canonical unit label for areas
pub const SQUARE_METERS: &str = "m²";

/// Unit label for counted items
pub const ITEMS: &str = "item";

/// Divisor from square millimeters to square meters
pub const MM2_PER_M2: f64 = 1_000_000.0;

/// Kind of quantity a measurement represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    /// Straight or derived length
    Length,
    /// Floor or surface area
    Area,
    /// Number of counted items (outlets, fixtures, doors)
    Count,
    /// Perimeter of a rectangular region
    Perimeter,
}

impl MeasurementKind {
    /// All kinds in reporting order
    pub const ALL: [MeasurementKind; 4] = [
        MeasurementKind::Length,
        MeasurementKind::Area,
        MeasurementKind::Count,
        MeasurementKind::Perimeter,
    ];

    /// Stable lowercase label used in exports
    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementKind::Length => "length",
            MeasurementKind::Area => "area",
            MeasurementKind::Count => "count",
            MeasurementKind::Perimeter => "perimeter",
        }
    }

    /// Canonical unit label for this kind
    pub fn canonical_unit(self) -> &'static str {
        match self {
            MeasurementKind::Length | MeasurementKind::Perimeter => MILLIMETERS,
            MeasurementKind::Area => SQUARE_METERS,
            MeasurementKind::Count => ITEMS,
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length unit accepted for caller-supplied dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthUnit {
    #[default]
    Millimeter,
    Centimeter,
    Meter,
}

impl LengthUnit {
    /// Multiplier into millimeters
    pub fn mm_factor(self) -> f64 {
        match self {
            LengthUnit::Millimeter => 1.0,
            LengthUnit::Centimeter => 10.0,
            LengthUnit::Meter => 1000.0,
        }
    }

    /// Convert a value in this unit to millimeters
    pub fn to_mm(self, value: f64) -> f64 {
        value * self.mm_factor()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Meter => "m",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned when a unit symbol is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown length unit '{0}' (expected mm, cm or m)")]
pub struct UnitParseError(pub String);

impl FromStr for LengthUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mm" => Ok(LengthUnit::Millimeter),
            "cm" => Ok(LengthUnit::Centimeter),
            "m" => Ok(LengthUnit::Meter),
            other => Err(UnitParseError(other.to_string())),
        }
    }
}

/// A point on the drawing, in pixel or plan coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanCoordinate {
    pub x: f64,
    pub y: f64,
}

impl PlanCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate
    pub fn distance_to(&self, other: &PlanCoordinate) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A line segment in pixel coordinates, as reported by a line detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn start(&self) -> PlanCoordinate {
        PlanCoordinate::new(f64::from(self.x1), f64::from(self.y1))
    }

    pub fn end(&self) -> PlanCoordinate {
        PlanCoordinate::new(f64::from(self.x2), f64::from(self.y2))
    }

    /// Length of the segment in pixels
    pub fn pixel_length(&self) -> f64 {
        self.start().distance_to(&self.end())
    }
}

impl From<(i32, i32, i32, i32)> for LineSegment {
    fn from((x1, y1, x2, y2): (i32, i32, i32, i32)) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

/// A single measurement in its canonical unit
///
/// Fields are private; a measurement cannot change once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    kind: MeasurementKind,
    value: f64,
    unit: String,
    label: String,
    location: Option<PlanCoordinate>,
    description: Option<String>,
}

impl Measurement {
    /// Create a measurement whose unit is the canonical unit of `kind`
    pub fn new(kind: MeasurementKind, value: f64, label: impl Into<String>) -> Self {
        Self {
            kind,
            value,
            unit: kind.canonical_unit().to_string(),
            label: label.into(),
            location: None,
            description: None,
        }
    }

    /// A length, already in millimeters
    pub fn length(value_mm: f64, label: impl Into<String>) -> Self {
        Self::new(MeasurementKind::Length, value_mm, label)
    }

    /// An area, already in square meters
    pub fn area(value_m2: f64, label: impl Into<String>) -> Self {
        Self::new(MeasurementKind::Area, value_m2, label)
    }

    /// A perimeter, already in millimeters
    pub fn perimeter(value_mm: f64, label: impl Into<String>) -> Self {
        Self::new(MeasurementKind::Perimeter, value_mm, label)
    }

    pub fn count(count: u64, label: impl Into<String>) -> Self {
        Self::new(MeasurementKind::Count, count as f64, label)
    }

    pub fn with_location(mut self, location: PlanCoordinate) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn location(&self) -> Option<PlanCoordinate> {
        self.location
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Value with two decimals and unit, for display only
    pub fn formatted_value(&self) -> String {
        format!("{:.2} {}", self.value, self.unit)
    }
}
