//! OCR fallback for image-only PDF pages.
//!
//! A page is rasterized with `pdftoppm` (poppler-utils) and the PNG is
//! recognized with the `tesseract` CLI. Both tools are invoked as blocking
//! child processes; intermediate images live in a temporary directory that
//! is removed when recognition finishes.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ExtractConfig;

/// Renders a single page to a raster image and recognizes its text.
pub trait PageOcr {
    /// `page_number` is 1-based.
    fn recognize(&self, document: &Path, page_number: u32) -> Result<String>;
}

/// `pdftoppm` + `tesseract` command-line OCR.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    dpi: u32,
    language: String,
}

impl TesseractOcr {
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            pdftoppm: config.pdftoppm.clone(),
            tesseract: config.tesseract.clone(),
            dpi: config.ocr_dpi,
            language: config.ocr_language.clone(),
        }
    }

    fn render_page(&self, document: &Path, page_number: u32, dir: &Path) -> Result<PathBuf> {
        let prefix = dir.join(format!("page-{}", page_number));
        let page = page_number.to_string();

        let output = Command::new(&self.pdftoppm)
            .args(["-png", "-singlefile", "-r"])
            .arg(self.dpi.to_string())
            .args(["-f", &page, "-l", &page])
            .arg(document)
            .arg(&prefix)
            .output()
            .with_context(|| {
                format!(
                    "Failed to execute {} (install poppler-utils)",
                    self.pdftoppm.display()
                )
            })?;

        if !output.status.success() {
            bail!(
                "pdftoppm failed on page {}: {}",
                page_number,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let png = prefix.with_extension("png");
        if !png.exists() {
            bail!("pdftoppm produced no image for page {}", page_number);
        }
        Ok(png)
    }
}

impl PageOcr for TesseractOcr {
    fn recognize(&self, document: &Path, page_number: u32) -> Result<String> {
        let dir = tempfile::tempdir().context("Failed to create OCR scratch directory")?;
        let image = self.render_page(document, page_number, dir.path())?;

        let output = Command::new(&self.tesseract)
            .arg(&image)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .with_context(|| format!("Failed to execute {}", self.tesseract.display()))?;

        if !output.status.success() {
            bail!(
                "tesseract failed on page {}: {}",
                page_number,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        tracing::debug!(
            page = page_number,
            bytes = output.stdout.len(),
            "OCR recognized page"
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// OCR backend that refuses every page. Used when OCR is not wanted.
pub struct NoOcr;

impl PageOcr for NoOcr {
    fn recognize(&self, _document: &Path, page_number: u32) -> Result<String> {
        bail!("OCR is not available (page {})", page_number)
    }
}
