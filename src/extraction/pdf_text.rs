//! Direct text extraction from a PDF's embedded text layer.
//!
//! Text comes from `pdf-extract`; the page count and document information dictionary come from
//! `lopdf`. Both are synchronous and CPU bound, so the work runs on the blocking pool.

use super::types::{PdfTextError, PdfTextOutput};
use async_trait::async_trait;
use lopdf::Object;
use std::collections::BTreeMap;

/// Interface implemented by structured PDF text extractors.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    /// Read the embedded text layer of an in-memory PDF.
    async fn extract(&self, pdf: &[u8]) -> Result<PdfTextOutput, PdfTextError>;
}

/// Pure-Rust extractor backed by `pdf-extract` and `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextExtractor;

#[async_trait]
impl PdfTextExtractor for LopdfTextExtractor {
    async fn extract(&self, pdf: &[u8]) -> Result<PdfTextOutput, PdfTextError> {
        let bytes = pdf.to_vec();
        tokio::task::spawn_blocking(move || extract_blocking(&bytes))
            .await
            .map_err(|error| PdfTextError::Task(error.to_string()))?
    }
}

fn extract_blocking(bytes: &[u8]) -> Result<PdfTextOutput, PdfTextError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|error| PdfTextError::Parse(error.to_string()))?;
    let pages = document.get_pages().len();
    let info = document_info(&document);

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|error| PdfTextError::Parse(error.to_string()))?;

    tracing::debug!(pages, chars = text.len(), "Extracted PDF text layer");
    Ok(PdfTextOutput { text, pages, info })
}

/// Collect the string entries of the trailer's `Info` dictionary.
fn document_info(document: &lopdf::Document) -> BTreeMap<String, String> {
    let info = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_object(*id).ok(),
        Ok(object) => Some(object),
        Err(_) => None,
    };

    let Some(Object::Dictionary(dictionary)) = info else {
        return BTreeMap::new();
    };

    dictionary
        .iter()
        .filter_map(|(key, value)| match value {
            Object::String(bytes, _) => Some((
                String::from_utf8_lossy(key).into_owned(),
                decode_pdf_string(bytes),
            )),
            _ => None,
        })
        .collect()
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark, otherwise UTF-8 with a
/// Latin-1 fallback.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&byte| byte as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf16_info_strings() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn decodes_latin1_info_strings() {
        assert_eq!(decode_pdf_string(b"Report"), "Report");
        assert_eq!(decode_pdf_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }

    #[tokio::test]
    async fn rejects_bytes_that_are_not_a_pdf() {
        let error = LopdfTextExtractor
            .extract(b"definitely not a pdf")
            .await
            .expect_err("garbage must not parse");
        assert!(matches!(error, PdfTextError::Parse(_)));
    }
}
