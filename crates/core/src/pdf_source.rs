//! PDF text source backed by the `pdf-engine` crate

use crate::source::{SourceError, SourceResult, TextSource, TextUnit};
use pdf_engine::{default_engine, OpenSource, PdfEngine};
use std::path::Path;

const NAME: &str = "PDF reader";

/// Reads the text layer of every page of a PDF
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextSource;

impl PdfTextSource {
    pub fn new() -> Self {
        Self
    }
}

impl TextSource for PdfTextSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn probe(&self) -> bool {
        true
    }

    fn read_units(&self, path: &Path) -> SourceResult<Vec<TextUnit>> {
        let mut engine = default_engine();
        let handle = engine
            .open(OpenSource::from(path))
            .map_err(|err| SourceError::collaborator(NAME, err))?;

        let page_count = engine
            .page_count(handle)
            .map_err(|err| SourceError::collaborator(NAME, err))?;

        let units = (0..page_count)
            .map(|page_index| match engine.page_text(handle, page_index) {
                Ok(Some(text)) => TextUnit::text(page_index, text),
                Ok(None) => TextUnit::empty(page_index),
                Err(err) => TextUnit::failed(page_index, SourceError::collaborator(NAME, err)),
            })
            .collect();

        if let Err(err) = engine.close(handle) {
            tracing::debug!(error = %err, "failed to close PDF handle");
        }

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_engine::fixtures::pdf_with_pages;

    fn write_pdf(pages: &[&[&str]]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), pdf_with_pages(pages)).unwrap();
        file
    }

    #[test]
    fn test_reads_one_unit_per_page() {
        let file = write_pdf(&[&["Door 800mm"], &[], &["Room 15.5m2"]]);
        let units = PdfTextSource::new().read_units(file.path()).unwrap();

        assert_eq!(units.len(), 3);
        assert!(units[0].text.as_ref().unwrap().as_deref().unwrap().contains("800mm"));
        assert!(units[1].text.as_ref().unwrap().is_none());
        assert_eq!(units[2].index, 2);
    }

    #[test]
    fn test_unreadable_pdf_is_collaborator_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a pdf").unwrap();

        let err = PdfTextSource::new().read_units(file.path()).unwrap_err();
        assert!(matches!(err, SourceError::Collaborator { collaborator: "PDF reader", .. }));
    }
}
