//! Extraction pipeline: PDF text layers, page rasterization, and optical recognition.

pub mod pdf_text;
pub mod rasterizer;
pub mod recognition;
mod service;
pub mod types;

pub use service::{ExtractionLimits, ExtractionService, page_marker};
pub use types::{
    Document, ExtractOptions, ExtractionError, ExtractionResult, ExtractionSource, MediaKind,
    PageImage, PdfTextOutput,
};
