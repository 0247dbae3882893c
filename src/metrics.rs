use crate::extraction::ExtractionSource;
use crate::summarization::SummaryMethod;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing extraction and summarization activity.
#[derive(Default)]
pub struct ServiceMetrics {
    image_ocr: AtomicU64,
    pdf_ocr: AtomicU64,
    pdf_text: AtomicU64,
    pages_recognized: AtomicU64,
    huggingface: AtomicU64,
    cohere: AtomicU64,
    extractive: AtomicU64,
    extractive_fallback: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished extraction and the number of pages sent through recognition.
    pub fn record_extraction(&self, source: ExtractionSource, pages_recognized: u64) {
        let counter = match source {
            ExtractionSource::ImageOcr => &self.image_ocr,
            ExtractionSource::PdfOcr => &self.pdf_ocr,
            ExtractionSource::PdfText => &self.pdf_text,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.pages_recognized
            .fetch_add(pages_recognized, Ordering::Relaxed);
    }

    /// Record a produced summary under the method that actually generated it.
    pub fn record_summary(&self, method: SummaryMethod) {
        let counter = match method {
            SummaryMethod::HuggingFace => &self.huggingface,
            SummaryMethod::Cohere => &self.cohere,
            SummaryMethod::Extractive => &self.extractive,
            SummaryMethod::ExtractiveFallback => &self.extractive_fallback,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            extractions: ExtractionCounts {
                image_ocr: self.image_ocr.load(Ordering::Relaxed),
                pdf_ocr: self.pdf_ocr.load(Ordering::Relaxed),
                pdf_text: self.pdf_text.load(Ordering::Relaxed),
            },
            pages_recognized: self.pages_recognized.load(Ordering::Relaxed),
            summaries: SummaryCounts {
                huggingface: self.huggingface.load(Ordering::Relaxed),
                cohere: self.cohere.load(Ordering::Relaxed),
                extractive: self.extractive.load(Ordering::Relaxed),
                extractive_fallback: self.extractive_fallback.load(Ordering::Relaxed),
            },
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Completed extractions keyed by the path that produced the text.
    pub extractions: ExtractionCounts,
    /// Total PDF pages handed to the recognition engine.
    pub pages_recognized: u64,
    /// Produced summaries keyed by the method that produced them.
    pub summaries: SummaryCounts,
}

/// Extraction counters split by source.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ExtractionCounts {
    /// Images recognized directly.
    pub image_ocr: u64,
    /// PDFs that went through the page recognition loop.
    pub pdf_ocr: u64,
    /// PDFs served from their embedded text layer.
    pub pdf_text: u64,
}

/// Summary counters split by method.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SummaryCounts {
    /// Summaries produced by Hugging Face.
    pub huggingface: u64,
    /// Summaries produced by Cohere.
    pub cohere: u64,
    /// Summaries produced locally after the provider chain.
    pub extractive: u64,
    /// Summaries produced locally after an internal failure.
    pub extractive_fallback: u64,
}
