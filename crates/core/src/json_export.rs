//! JSON export for ledger measurements
//!
//! The document carries the drawing scale, every measurement in ledger order
//! (absent optional fields are written as `null`) and a per-kind summary.

use crate::ledger::{ExportResult, KindCounts, Ledger};
use crate::measurement::Measurement;
use serde::Serialize;
use std::io::Write;

/// Serialized form of a whole ledger
#[derive(Debug, Serialize)]
pub struct LedgerDocument<'a> {
    pub scale: f64,
    pub measurements: &'a [Measurement],
    pub summary: SummaryDocument,
}

#[derive(Debug, Serialize)]
pub struct SummaryDocument {
    pub total_measurements: usize,
    pub by_type: KindCounts,
}

impl<'a> LedgerDocument<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            scale: ledger.scale(),
            measurements: ledger.measurements(),
            summary: SummaryDocument {
                total_measurements: ledger.len(),
                by_type: ledger.count_by_kind(),
            },
        }
    }
}

/// Write the ledger as pretty-printed JSON
pub fn export_json<W: Write>(mut writer: W, ledger: &Ledger) -> ExportResult<()> {
    serde_json::to_writer_pretty(&mut writer, &LedgerDocument::new(ledger))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
