//! Per-page PDF text extraction with an optional OCR fallback.
//!
//! Every page is first read structurally (text operators only, no
//! rasterization). A page is handed to OCR only when the caller asked for
//! the fallback **and** its structural text is blank after trimming; OCR is
//! never invoked otherwise, not even for blank pages.
//!
//! Each page's text is trimmed, and the result keeps exactly one entry per
//! physical page, in order, including empty strings.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::models::{ExtractedText, PageOrigin, PageText};
use crate::ocr::PageOcr;
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};

/// An opened document whose pages can be read in physical order.
pub trait PageSource {
    /// Path of the underlying file (handed to OCR).
    fn path(&self) -> &Path;
    fn page_count(&self) -> usize;
    /// Structural text of the 0-based page `index`, untrimmed.
    fn structural_text(&self, index: usize) -> Result<String, PipelineError>;
}

/// A PDF opened for the duration of one extraction.
pub struct PdfDocument {
    path: PathBuf,
    pages: Vec<String>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)
            .map_err(|e| PipelineError::Extraction(format!("{}: {}", path.display(), e)))?;
        // pdf_extract can panic on malformed PDFs
        let pages =
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
                .map_err(|_| {
                    PipelineError::Extraction(format!("{}: malformed PDF", path.display()))
                })?
                .map_err(|e| PipelineError::Extraction(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), pages = pages.len(), "opened document");
        Ok(Self {
            path: path.to_path_buf(),
            pages,
        })
    }

    /// Release the document.
    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "closed document");
    }
}

impl PageSource for PdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn structural_text(&self, index: usize) -> Result<String, PipelineError> {
        self.pages.get(index).cloned().ok_or_else(|| {
            PipelineError::Extraction(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                self.pages.len()
            ))
        })
    }
}

/// Produces [`ExtractedText`] from a document path.
pub struct PageTextExtractor<'a> {
    ocr: &'a dyn PageOcr,
    progress: &'a dyn ProgressReporter,
}

impl<'a> PageTextExtractor<'a> {
    pub fn new(ocr: &'a dyn PageOcr) -> Self {
        Self {
            ocr,
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Extract every page of the PDF at `path`.
    ///
    /// Fails with [`PipelineError::NotFound`] before opening anything when
    /// `path` is not an existing file.
    pub fn extract(&self, path: &Path, ocr_fallback: bool) -> Result<ExtractedText, PipelineError> {
        let document = PdfDocument::open(path)?;
        let result = self.extract_pages(&document, ocr_fallback);
        document.close();
        result
    }

    /// Walk the pages of an opened document in order.
    pub fn extract_pages(
        &self,
        document: &dyn PageSource,
        ocr_fallback: bool,
    ) -> Result<ExtractedText, PipelineError> {
        let total = document.page_count();
        let mut pages = Vec::with_capacity(total);

        for index in 0..total {
            let number = (index + 1) as u32;
            let structural = document.structural_text(index)?;

            let (text, origin) = if needs_ocr(ocr_fallback, &structural) {
                tracing::debug!(page = number, "blank page, running OCR");
                let recognized = self
                    .ocr
                    .recognize(document.path(), number)
                    .map_err(|e| {
                        PipelineError::Extraction(format!("OCR page {}: {:#}", number, e))
                    })?;
                (recognized, PageOrigin::Ocr)
            } else {
                (structural, PageOrigin::Structural)
            };

            pages.push(PageText {
                number,
                text: text.trim().to_string(),
                origin,
            });
            self.progress.report(ProgressEvent::Extracting {
                page: number as u64,
                total: total as u64,
            });
        }

        Ok(ExtractedText { pages })
    }
}

/// OCR runs iff the fallback is enabled and the structural text is blank.
pub fn needs_ocr(ocr_fallback: bool, structural_text: &str) -> bool {
    ocr_fallback && structural_text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeDocument {
        pages: Vec<&'static str>,
    }

    impl PageSource for FakeDocument {
        fn path(&self) -> &Path {
            Path::new("fake.pdf")
        }
        fn page_count(&self) -> usize {
            self.pages.len()
        }
        fn structural_text(&self, index: usize) -> Result<String, PipelineError> {
            Ok(self.pages[index].to_string())
        }
    }

    #[derive(Default)]
    struct RecordingOcr {
        calls: RefCell<Vec<u32>>,
    }

    impl PageOcr for RecordingOcr {
        fn recognize(&self, _document: &Path, page_number: u32) -> anyhow::Result<String> {
            self.calls.borrow_mut().push(page_number);
            Ok(format!("  ocr text {}  \n", page_number))
        }
    }

    #[test]
    fn ocr_decision_table() {
        let cases = [
            (true, "   \n\t", true),
            (true, "real text", false),
            (false, "", false),
            (false, "real text", false),
        ];
        for (flag, text, expected) in cases {
            let ocr = RecordingOcr::default();
            let extractor = PageTextExtractor::new(&ocr);
            let doc = FakeDocument { pages: vec![text] };
            let extracted = extractor.extract_pages(&doc, flag).unwrap();

            assert_eq!(needs_ocr(flag, text), expected);
            assert_eq!(
                ocr.calls.borrow().len(),
                usize::from(expected),
                "flag={} text={:?}",
                flag,
                text
            );
            let origin = extracted.pages[0].origin;
            if expected {
                assert_eq!(origin, PageOrigin::Ocr);
                assert_eq!(extracted.pages[0].text, "ocr text 1");
            } else {
                assert_eq!(origin, PageOrigin::Structural);
            }
        }
    }

    #[test]
    fn pages_are_trimmed_and_kept_in_order() {
        let ocr = RecordingOcr::default();
        let extractor = PageTextExtractor::new(&ocr);
        let doc = FakeDocument {
            pages: vec!["  one  ", "", "\nthree\n"],
        };
        let extracted = extractor.extract_pages(&doc, false).unwrap();
        let texts: Vec<&str> = extracted.pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "", "three"]);
        assert_eq!(extracted.joined(), "one\n\nthree");
        assert!(ocr.calls.borrow().is_empty());
    }

    #[test]
    fn only_blank_pages_are_recognized() {
        let ocr = RecordingOcr::default();
        let extractor = PageTextExtractor::new(&ocr);
        let doc = FakeDocument {
            pages: vec!["text", " ", "more", ""],
        };
        extractor.extract_pages(&doc, true).unwrap();
        assert_eq!(*ocr.calls.borrow(), vec![2, 4]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let ocr = RecordingOcr::default();
        let extractor = PageTextExtractor::new(&ocr);
        let err = extractor
            .extract(Path::new("/definitely/not/here.pdf"), true)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(ocr.calls.borrow().is_empty());
    }

    #[test]
    fn invalid_pdf_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let ocr = RecordingOcr::default();
        let err = PageTextExtractor::new(&ocr)
            .extract(&path, false)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
    }
}
