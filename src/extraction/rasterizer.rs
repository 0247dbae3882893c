//! Page rasterization for scanned PDFs.
//!
//! A [`PageRasterizer`] opens a [`PageSource`] per document; the source renders one page at a
//! time on demand and reports `Ok(None)` once the requested page lies beyond the end of the
//! document. The poppler-backed implementation keeps the PDF in a scratch directory that is
//! removed when the source is dropped.

use super::types::{Document, PageImage, RasterError};
use async_trait::async_trait;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::process::Command;

/// Exit code `pdftoppm` uses for "wrong page range".
const PDFTOPPM_RANGE_EXIT: i32 = 99;

/// Interface implemented by PDF page rasterizers.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Prepare a document for page-by-page rendering.
    async fn open(&self, document: &Document) -> Result<Box<dyn PageSource>, RasterError>;
}

/// Lazily renders the pages of one opened document.
#[async_trait]
pub trait PageSource: Send {
    /// Render a 1-based page, or return `Ok(None)` when the page does not exist.
    async fn render(&mut self, page: u32) -> Result<Option<PageImage>, RasterError>;
}

/// Rasterizer driving poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    command: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    /// Build a rasterizer invoking `command` at the given resolution.
    pub fn new(command: impl Into<String>, dpi: u32) -> Self {
        Self {
            command: command.into(),
            dpi,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn open(&self, document: &Document) -> Result<Box<dyn PageSource>, RasterError> {
        let scratch = tempfile::tempdir().map_err(|error| {
            RasterError::Unavailable(format!("failed to create scratch directory: {error}"))
        })?;
        let input = scratch.path().join("input.pdf");
        tokio::fs::write(&input, &document.bytes)
            .await
            .map_err(|error| {
                RasterError::Unavailable(format!("failed to stage PDF for rasterization: {error}"))
            })?;

        Ok(Box::new(PdftoppmPageSource {
            command: self.command.clone(),
            dpi: self.dpi,
            input,
            scratch,
        }))
    }
}

struct PdftoppmPageSource {
    command: String,
    dpi: u32,
    input: PathBuf,
    scratch: TempDir,
}

#[async_trait]
impl PageSource for PdftoppmPageSource {
    async fn render(&mut self, page: u32) -> Result<Option<PageImage>, RasterError> {
        let root = self.scratch.path().join(format!("page-{page}"));
        let page_arg = page.to_string();
        let output = Command::new(&self.command)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-singlefile")
            .arg(&self.input)
            .arg(&root)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                RasterError::Unavailable(format!("failed to run {}: {error}", self.command))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_out_of_range(output.status.code(), &stderr) {
                return Ok(None);
            }
            return Err(RasterError::Render {
                page,
                message: stderr.trim().to_string(),
            });
        }

        let png = root.with_extension("png");
        let bytes = match tokio::fs::read(&png).await {
            Ok(bytes) => bytes,
            // pdftoppm writes nothing when the page range is empty.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(RasterError::Render {
                    page,
                    message: error.to_string(),
                });
            }
        };
        if let Err(error) = tokio::fs::remove_file(&png).await {
            tracing::debug!(page, error = %error, "Failed to remove rendered page");
        }

        Ok(Some(PageImage { page, bytes }))
    }
}

fn is_out_of_range(code: Option<i32>, stderr: &str) -> bool {
    code == Some(PDFTOPPM_RANGE_EXIT) || stderr.contains("Wrong page range")
}
