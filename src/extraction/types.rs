//! Core data types and error definitions for the extraction pipeline.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Image mimetypes accepted by the recognition path.
pub const SUPPORTED_IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/tiff",
    "image/bmp",
];

/// Mimetype of PDF uploads.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Declared kind of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Portable Document Format, possibly scanned.
    Pdf,
    /// Raster image handed straight to recognition.
    Image,
}

impl MediaKind {
    /// Map a declared mimetype onto a media kind, returning `None` for unsupported types.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime == PDF_MIME_TYPE {
            Some(Self::Pdf)
        } else if SUPPORTED_IMAGE_MIME_TYPES.contains(&mime.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Resolve the kind of an upload from its declared mimetype, sniffing the PDF magic
    /// header when no mimetype was sent.
    pub fn detect(mime: Option<&str>, bytes: &[u8]) -> Option<Self> {
        match mime.map(str::trim).filter(|value| !value.is_empty()) {
            Some(mime) if mime.eq_ignore_ascii_case("application/octet-stream") => {
                Self::sniff(bytes)
            }
            Some(mime) => Self::from_mime(mime),
            None => Self::sniff(bytes),
        }
    }

    fn sniff(bytes: &[u8]) -> Option<Self> {
        bytes.starts_with(b"%PDF-").then_some(Self::Pdf)
    }
}

/// An uploaded document held in memory for the duration of one extraction call.
#[derive(Debug, Clone)]
pub struct Document {
    /// Raw upload bytes.
    pub bytes: Vec<u8>,
    /// Declared media kind.
    pub kind: MediaKind,
}

impl Document {
    /// Wrap raw bytes with their declared kind.
    pub fn new(bytes: Vec<u8>, kind: MediaKind) -> Self {
        Self { bytes, kind }
    }
}

/// One rasterized PDF page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page index within the source document.
    pub page: u32,
    /// Encoded raster bytes (PNG).
    pub bytes: Vec<u8>,
}

/// Path through the extraction pipeline that produced the returned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionSource {
    /// Image recognized directly.
    ImageOcr,
    /// PDF rasterized and recognized page by page.
    PdfOcr,
    /// PDF served from its embedded text layer.
    PdfText,
}

impl ExtractionSource {
    /// Stable wire tag for the source.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImageOcr => "image-ocr",
            Self::PdfOcr => "pdf-ocr",
            Self::PdfText => "pdf-text",
        }
    }
}

/// Text produced by the extraction pipeline. `text` is empty, never missing, when nothing was
/// recognized.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Extracted text; multi-page OCR output carries `--- Page N ---` markers.
    pub text: String,
    /// Path that produced the text.
    pub source: ExtractionSource,
}

/// Output of direct text extraction from a PDF's embedded text layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfTextOutput {
    /// Text of every page, as laid out by the extractor.
    pub text: String,
    /// Number of pages in the document.
    pub pages: usize,
    /// Entries of the document information dictionary (`Title`, `Author`, ...).
    pub info: BTreeMap<String, String>,
}

/// Options steering one extraction call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Skip the embedded text layer and always run recognition on PDFs.
    pub force_ocr: bool,
}

/// Errors emitted by the extraction pipeline.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The caller did not supply any document.
    #[error("No document supplied")]
    MissingDocument,
    /// The document's declared mimetype is not handled.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    /// The embedded text layer could not be read.
    #[error("Failed to extract PDF text: {0}")]
    PdfText(#[from] PdfTextError),
}

/// Errors raised while reading a PDF's embedded text layer.
#[derive(Debug, Error)]
pub enum PdfTextError {
    /// The bytes did not parse as a PDF.
    #[error("Invalid PDF: {0}")]
    Parse(String),
    /// The blocking extraction task did not complete.
    #[error("PDF extraction task failed: {0}")]
    Task(String),
}

/// Errors raised while rasterizing PDF pages.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The rasterizer process could not be started or its scratch space prepared.
    #[error("Rasterizer unavailable: {0}")]
    Unavailable(String),
    /// Rendering a page failed for a reason other than the page being out of range.
    #[error("Failed to render page {page}: {message}")]
    Render {
        /// Page that failed to render.
        page: u32,
        /// Diagnostic output captured from the rasterizer.
        message: String,
    },
}

/// Errors raised by the recognition engine.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The engine could not be initialized with the configured language model.
    #[error("Recognition engine unavailable: {0}")]
    Unavailable(String),
    /// The engine failed to recognize the supplied image.
    #[error("Recognition failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_mimetypes() {
        assert_eq!(MediaKind::from_mime("application/pdf"), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::from_mime("image/PNG"), Some(MediaKind::Image));
        assert_eq!(
            MediaKind::from_mime("image/jpeg; charset=binary"),
            Some(MediaKind::Image)
        );
        assert_eq!(MediaKind::from_mime("image/svg+xml"), None);
        assert_eq!(MediaKind::from_mime("text/plain"), None);
    }

    #[test]
    fn sniffs_pdf_when_mimetype_missing() {
        assert_eq!(MediaKind::detect(None, b"%PDF-1.7\n"), Some(MediaKind::Pdf));
        assert_eq!(
            MediaKind::detect(Some("application/octet-stream"), b"%PDF-1.4"),
            Some(MediaKind::Pdf)
        );
        assert_eq!(MediaKind::detect(None, b"\x89PNG"), None);
    }

    #[test]
    fn source_tags_match_wire_format() {
        assert_eq!(
            serde_json::to_value(ExtractionSource::PdfOcr).unwrap(),
            serde_json::json!("pdf-ocr")
        );
        assert_eq!(ExtractionSource::ImageOcr.as_str(), "image-ocr");
        assert_eq!(ExtractionSource::PdfText.as_str(), "pdf-text");
    }
}
