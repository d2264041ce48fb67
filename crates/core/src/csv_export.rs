//! CSV export for ledger measurements
//!
//! Writes one row per measurement in ledger order for spreadsheets and
//! estimating tools.

use crate::ledger::{ExportResult, Ledger};
use crate::measurement::Measurement;
use std::io::Write;

/// Configuration for CSV export
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,

    /// CSV delimiter character
    pub delimiter: u8,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            include_headers: true,
            delimiter: b',',
        }
    }
}

/// Column headers, in row order
pub const HEADERS: [&str; 5] = ["kind", "value", "unit", "label", "description"];

/// Export measurements to CSV format
///
/// CSV columns:
/// - kind: length, area, count or perimeter
/// - value: value in the canonical unit, full precision
/// - unit: canonical unit label
/// - label: measurement label
/// - description: free text, empty when absent
pub fn export_csv<W: Write>(
    writer: W,
    ledger: &Ledger,
    config: &CsvExportConfig,
) -> ExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record(HEADERS)?;
    }

    for measurement in ledger.measurements() {
        csv_writer.write_record(row(measurement))?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn row(measurement: &Measurement) -> [String; 5] {
    [
        measurement.kind().to_string(),
        measurement.value().to_string(),
        measurement.unit().to_string(),
        measurement.label().to_string(),
        measurement.description().unwrap_or_default().to_string(),
    ]
}
