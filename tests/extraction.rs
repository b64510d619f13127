//! Page extraction against synthetic multi-page PDFs.
//!
//! Asserts: one entry per physical page, page order preserved, blank pages
//! kept as empty strings, and OCR only for blank pages with the fallback on.

use std::cell::RefCell;
use std::path::Path;

use digest_bench::error::PipelineError;
use digest_bench::extract::PageTextExtractor;
use digest_bench::models::PageOrigin;
use digest_bench::ocr::{NoOcr, PageOcr};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use proptest::prelude::*;
use tempfile::TempDir;

/// Build a PDF whose page `i` shows `Marker<i>` (1-based), or nothing when
/// `blank[i]` is set.
fn pdf_with_pages(blank: &[bool]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (i, &is_blank) in blank.iter().enumerate() {
        let operations = if is_blank {
            vec![]
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Marker{}", i + 1))],
                ),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn write_pdf(dir: &TempDir, blank: &[bool]) -> std::path::PathBuf {
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, pdf_with_pages(blank)).unwrap();
    path
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Records every OCR request and answers with a fixed string.
struct RecordingOcr {
    pages: RefCell<Vec<u32>>,
}

impl PageOcr for RecordingOcr {
    fn recognize(&self, _document: &Path, page_number: u32) -> anyhow::Result<String> {
        self.pages.borrow_mut().push(page_number);
        Ok(format!("  scanned {}  ", page_number))
    }
}

#[test]
fn three_pages_in_order() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(&dir, &[false, false, false]);

    let extracted = PageTextExtractor::new(&NoOcr).extract(&path, false).unwrap();

    assert_eq!(extracted.page_count(), 3);
    for (i, page) in extracted.pages.iter().enumerate() {
        assert_eq!(page.number, i as u32 + 1);
        assert!(
            squash(&page.text).contains(&format!("Marker{}", i + 1)),
            "page {} text was {:?}",
            i + 1,
            page.text
        );
    }
    let joined = squash(&extracted.joined());
    let first = joined.find("Marker1").unwrap();
    let third = joined.find("Marker3").unwrap();
    assert!(first < third);
}

#[test]
fn blank_page_goes_to_ocr_only_with_fallback() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(&dir, &[false, true, false]);

    let ocr = RecordingOcr {
        pages: RefCell::new(vec![]),
    };
    let without = PageTextExtractor::new(&ocr).extract(&path, false).unwrap();
    assert!(ocr.pages.borrow().is_empty());
    assert_eq!(without.pages[1].text, "");
    assert_eq!(without.joined().matches('\n').count(), 2);

    let with = PageTextExtractor::new(&ocr).extract(&path, true).unwrap();
    assert_eq!(*ocr.pages.borrow(), vec![2]);
    assert_eq!(with.pages[1].text, "scanned 2");
    assert_eq!(with.pages[1].origin, PageOrigin::Ocr);
    assert_eq!(with.pages[0].origin, PageOrigin::Structural);
    assert_eq!(with.ocr_pages(), 1);
}

#[test]
fn missing_document_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = PageTextExtractor::new(&NoOcr)
        .extract(&dir.path().join("missing.pdf"), true)
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[test]
fn corrupt_document_is_extraction_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"not a pdf at all").unwrap();
    let err = PageTextExtractor::new(&NoOcr).extract(&path, false).unwrap_err();
    assert!(matches!(err, PipelineError::Extraction(_)));
}

/// Property: N pages in, N entries out, in physical order.
#[test]
fn proptest_page_count_and_order() {
    let config = ProptestConfig::with_cases(24);
    proptest!(config, |(blank in proptest::collection::vec(any::<bool>(), 1..8))| {
        let dir = TempDir::new().unwrap();
        let path = write_pdf(&dir, &blank);

        let extracted = PageTextExtractor::new(&NoOcr).extract(&path, false).unwrap();

        prop_assert_eq!(extracted.page_count(), blank.len());
        for (i, page) in extracted.pages.iter().enumerate() {
            prop_assert_eq!(page.number, i as u32 + 1);
            let marker = format!("Marker{}", i + 1);
            if blank[i] {
                prop_assert_eq!(page.text.as_str(), "");
            } else {
                prop_assert!(squash(&page.text).contains(&marker));
            }
        }
    });
}
