//! Extraction service choosing between a PDF's text layer and page-by-page recognition.

use crate::{
    config::Config,
    extraction::{
        pdf_text::{LopdfTextExtractor, PdfTextExtractor},
        rasterizer::{PageRasterizer, PdftoppmRasterizer},
        recognition::{RecognitionEngine, RecognitionSession, TesseractEngine},
        types::{
            Document, ExtractOptions, ExtractionError, ExtractionResult, ExtractionSource,
            MediaKind, PdfTextOutput,
        },
    },
    metrics::ServiceMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Bounds applied to the recognition path.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionLimits {
    /// Safety ceiling on the number of pages rasterized per document.
    pub max_pages: u32,
    /// Upper bound for rendering or recognizing a single page.
    pub page_timeout: Duration,
}

impl ExtractionLimits {
    /// Read the limits from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.ocr_max_pages,
            page_timeout: config.ocr_page_timeout,
        }
    }
}

/// Marker inserted before each page of multi-page recognition output.
pub fn page_marker(page: u32) -> String {
    format!("\n\n--- Page {page} ---\n\n")
}

/// Turns uploaded documents into text.
///
/// The service owns shared handles to the text-layer extractor, the rasterizer, and the
/// recognition engine. Construct it once near process start and share it through an `Arc`.
pub struct ExtractionService {
    pdf_text: Arc<dyn PdfTextExtractor>,
    rasterizer: Arc<dyn PageRasterizer>,
    engine: Arc<dyn RecognitionEngine>,
    limits: ExtractionLimits,
    metrics: Arc<ServiceMetrics>,
}

impl ExtractionService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        pdf_text: Arc<dyn PdfTextExtractor>,
        rasterizer: Arc<dyn PageRasterizer>,
        engine: Arc<dyn RecognitionEngine>,
        limits: ExtractionLimits,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            pdf_text,
            rasterizer,
            engine,
            limits,
            metrics,
        }
    }

    /// Build the production service: `pdf-extract` for text layers, `pdftoppm` for pages and
    /// `tesseract` for recognition.
    pub fn from_config(config: &Config, metrics: Arc<ServiceMetrics>) -> Self {
        Self::new(
            Arc::new(LopdfTextExtractor),
            Arc::new(PdftoppmRasterizer::new(
                config.pdftoppm_cmd.clone(),
                config.ocr_raster_dpi,
            )),
            Arc::new(TesseractEngine::new(
                config.tesseract_cmd.clone(),
                config.ocr_language.clone(),
            )),
            ExtractionLimits::from_config(config),
            metrics,
        )
    }

    /// Read the embedded text layer of a PDF without any recognition fallback.
    pub async fn extract_pdf_text(
        &self,
        pdf: Option<&[u8]>,
    ) -> Result<PdfTextOutput, ExtractionError> {
        let pdf = pdf.ok_or(ExtractionError::MissingDocument)?;
        Ok(self.pdf_text.extract(pdf).await?)
    }

    /// Extract text from a document, degrading to empty text rather than failing once a
    /// document has been supplied.
    pub async fn extract(
        &self,
        document: Option<Document>,
        options: ExtractOptions,
    ) -> Result<ExtractionResult, ExtractionError> {
        let document = document.ok_or(ExtractionError::MissingDocument)?;
        tracing::info!(
            kind = ?document.kind,
            bytes = document.bytes.len(),
            force_ocr = options.force_ocr,
            "Extracting document"
        );

        let (result, pages_recognized) = match document.kind {
            MediaKind::Image => (
                ExtractionResult {
                    text: self.recognize_image(&document).await,
                    source: ExtractionSource::ImageOcr,
                },
                0,
            ),
            MediaKind::Pdf => self.extract_pdf(&document, options).await,
        };

        self.metrics
            .record_extraction(result.source, pages_recognized);
        tracing::info!(
            source = result.source.as_str(),
            chars = result.text.len(),
            pages_recognized,
            "Extraction completed"
        );
        Ok(result)
    }

    async fn extract_pdf(
        &self,
        document: &Document,
        options: ExtractOptions,
    ) -> (ExtractionResult, u64) {
        if !options.force_ocr {
            match self.pdf_text.extract(&document.bytes).await {
                Ok(output) if !output.text.trim().is_empty() => {
                    return (
                        ExtractionResult {
                            text: output.text,
                            source: ExtractionSource::PdfText,
                        },
                        0,
                    );
                }
                Ok(output) => {
                    tracing::debug!(
                        pages = output.pages,
                        "PDF text layer is empty; falling back to recognition"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        error = %error,
                        "PDF text extraction failed; falling back to recognition"
                    );
                }
            }
        }

        let (text, pages) = self.recognize_pages(document).await;
        (
            ExtractionResult {
                text,
                source: ExtractionSource::PdfOcr,
            },
            pages,
        )
    }

    async fn recognize_image(&self, document: &Document) -> String {
        let Some(mut session) = self.acquire_engine().await else {
            return String::new();
        };
        self.recognize(session.as_mut(), &document.bytes, None)
            .await
    }

    /// Rasterize and recognize pages in order until the document ends, a page fails to render,
    /// or the page ceiling is reached.
    async fn recognize_pages(&self, document: &Document) -> (String, u64) {
        let Some(mut session) = self.acquire_engine().await else {
            return (String::new(), 0);
        };
        let mut source = match self.rasterizer.open(document).await {
            Ok(source) => source,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to open PDF for rasterization");
                return (String::new(), 0);
            }
        };

        let mut accumulated = String::new();
        let mut recognized = 0u64;
        for page in 1..=self.limits.max_pages {
            let image = match timeout(self.limits.page_timeout, source.render(page)).await {
                Ok(Ok(Some(image))) => image,
                Ok(Ok(None)) => {
                    tracing::debug!(page, "No more pages");
                    break;
                }
                Ok(Err(error)) => {
                    tracing::warn!(page, error = %error, "Rasterization failed; stopping page loop");
                    break;
                }
                Err(_) => {
                    tracing::warn!(page, "Rasterization timed out; stopping page loop");
                    break;
                }
            };

            let text = self
                .recognize(session.as_mut(), &image.bytes, Some(page))
                .await;
            drop(image);
            accumulated.push_str(&page_marker(page));
            accumulated.push_str(&text);
            recognized += 1;
        }

        (accumulated.trim().to_string(), recognized)
    }

    async fn acquire_engine(&self) -> Option<Box<dyn RecognitionSession>> {
        match timeout(self.limits.page_timeout, self.engine.acquire()).await {
            Ok(Ok(session)) => Some(session),
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "Recognition engine unavailable");
                None
            }
            Err(_) => {
                tracing::warn!("Recognition engine initialization timed out");
                None
            }
        }
    }

    async fn recognize(
        &self,
        session: &mut dyn RecognitionSession,
        image: &[u8],
        page: Option<u32>,
    ) -> String {
        match timeout(self.limits.page_timeout, session.recognize(image)).await {
            Ok(Ok(text)) => text,
            Ok(Err(error)) => {
                tracing::warn!(page, error = %error, "Recognition failed; using empty text");
                String::new()
            }
            Err(_) => {
                tracing::warn!(page, "Recognition timed out; using empty text");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::rasterizer::PageSource;
    use crate::extraction::types::{PageImage, PdfTextError, RasterError, RecognitionError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedText(Result<&'static str, ()>);

    #[async_trait]
    impl PdfTextExtractor for FixedText {
        async fn extract(&self, _pdf: &[u8]) -> Result<PdfTextOutput, PdfTextError> {
            match self.0 {
                Ok(text) => Ok(PdfTextOutput {
                    text: text.to_string(),
                    pages: 1,
                    info: Default::default(),
                }),
                Err(()) => Err(PdfTextError::Parse("broken xref".into())),
            }
        }
    }

    /// Renders `pages` pages, then reports the end of the document. A page listed in
    /// `broken_page` fails to render instead, and `hung_page` never finishes rendering.
    struct FakeRasterizer {
        pages: u32,
        broken_page: Option<u32>,
        hung_page: Option<u32>,
        rendered: Arc<Mutex<Vec<u32>>>,
    }

    impl FakeRasterizer {
        fn new(pages: u32) -> Self {
            Self {
                pages,
                broken_page: None,
                hung_page: None,
                rendered: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    struct FakeSource {
        pages: u32,
        broken_page: Option<u32>,
        hung_page: Option<u32>,
        rendered: Arc<Mutex<Vec<u32>>>,
    }

    #[async_trait]
    impl PageRasterizer for FakeRasterizer {
        async fn open(&self, _document: &Document) -> Result<Box<dyn PageSource>, RasterError> {
            Ok(Box::new(FakeSource {
                pages: self.pages,
                broken_page: self.broken_page,
                hung_page: self.hung_page,
                rendered: self.rendered.clone(),
            }))
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn render(&mut self, page: u32) -> Result<Option<PageImage>, RasterError> {
            self.rendered.lock().unwrap().push(page);
            if Some(page) == self.hung_page {
                std::future::pending::<()>().await;
            }
            if Some(page) == self.broken_page {
                return Err(RasterError::Render {
                    page,
                    message: "corrupt page".into(),
                });
            }
            if page > self.pages {
                return Ok(None);
            }
            Ok(Some(PageImage {
                page,
                bytes: format!("page {page}").into_bytes(),
            }))
        }
    }

    /// Echoes the image bytes back as recognized text; `fail_on` makes one image fail and
    /// `hang_on` makes one image never finish.
    struct EchoEngine {
        acquisitions: Arc<AtomicUsize>,
        fail_on: Option<&'static str>,
        hang_on: Option<&'static str>,
        available: bool,
    }

    impl EchoEngine {
        fn new() -> Self {
            Self {
                acquisitions: Arc::new(AtomicUsize::new(0)),
                fail_on: None,
                hang_on: None,
                available: true,
            }
        }
    }

    struct EchoSession {
        fail_on: Option<&'static str>,
        hang_on: Option<&'static str>,
    }

    #[async_trait]
    impl RecognitionEngine for EchoEngine {
        async fn acquire(&self) -> Result<Box<dyn RecognitionSession>, RecognitionError> {
            if !self.available {
                return Err(RecognitionError::Unavailable("no eng.traineddata".into()));
            }
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoSession {
                fail_on: self.fail_on,
                hang_on: self.hang_on,
            }))
        }
    }

    #[async_trait]
    impl RecognitionSession for EchoSession {
        async fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError> {
            let text = String::from_utf8_lossy(image).into_owned();
            if self.hang_on == Some(text.as_str()) {
                std::future::pending::<()>().await;
            }
            if self.fail_on == Some(text.as_str()) {
                return Err(RecognitionError::Failed("engine crashed".into()));
            }
            Ok(text)
        }
    }

    fn service(
        pdf_text: FixedText,
        rasterizer: FakeRasterizer,
        engine: EchoEngine,
        max_pages: u32,
    ) -> ExtractionService {
        ExtractionService::new(
            Arc::new(pdf_text),
            Arc::new(rasterizer),
            Arc::new(engine),
            ExtractionLimits {
                max_pages,
                page_timeout: Duration::from_secs(5),
            },
            Arc::new(ServiceMetrics::new()),
        )
    }

    fn pdf() -> Option<Document> {
        Some(Document::new(b"%PDF-1.4".to_vec(), MediaKind::Pdf))
    }

    #[tokio::test]
    async fn missing_document_is_rejected() {
        let service = service(FixedText(Ok("")), FakeRasterizer::new(0), EchoEngine::new(), 100);
        let error = service
            .extract(None, ExtractOptions::default())
            .await
            .expect_err("no document");
        assert!(matches!(error, ExtractionError::MissingDocument));
    }

    #[tokio::test]
    async fn text_layer_wins_when_present() {
        let rasterizer = FakeRasterizer::new(3);
        let rendered = rasterizer.rendered.clone();
        let service = service(FixedText(Ok("Hello layer")), rasterizer, EchoEngine::new(), 100);

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfText);
        assert_eq!(result.text, "Hello layer");
        assert!(rendered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_text_layer_falls_back_to_recognition() {
        let service = service(
            FixedText(Ok("  \n\t ")),
            FakeRasterizer::new(2),
            EchoEngine::new(),
            100,
        );

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert_eq!(result.text, "--- Page 1 ---\n\npage 1\n\n--- Page 2 ---\n\npage 2");
    }

    #[tokio::test]
    async fn broken_text_layer_falls_back_to_recognition() {
        let service = service(FixedText(Err(())), FakeRasterizer::new(1), EchoEngine::new(), 100);

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert_eq!(result.text, "--- Page 1 ---\n\npage 1");
    }

    #[tokio::test]
    async fn forced_recognition_skips_text_layer() {
        let service = service(
            FixedText(Ok("embedded text")),
            FakeRasterizer::new(1),
            EchoEngine::new(),
            100,
        );

        let result = service
            .extract(pdf(), ExtractOptions { force_ocr: true })
            .await
            .unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert!(result.text.contains("page 1"));
    }

    #[tokio::test]
    async fn page_loop_stops_at_first_render_failure() {
        let mut rasterizer = FakeRasterizer::new(5);
        rasterizer.broken_page = Some(3);
        let rendered = rasterizer.rendered.clone();
        let service = service(FixedText(Ok("")), rasterizer, EchoEngine::new(), 100);

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert!(result.text.contains("page 2"));
        assert!(!result.text.contains("Page 3"));
        assert_eq!(*rendered.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn page_loop_respects_ceiling() {
        let rasterizer = FakeRasterizer::new(10);
        let rendered = rasterizer.rendered.clone();
        let service = service(FixedText(Ok("")), rasterizer, EchoEngine::new(), 4);

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert!(result.text.contains("--- Page 4 ---"));
        assert!(!result.text.contains("--- Page 5 ---"));
        assert_eq!(rendered.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn engine_is_acquired_once_per_document() {
        let engine = EchoEngine::new();
        let acquisitions = engine.acquisitions.clone();
        let service = service(FixedText(Ok("")), FakeRasterizer::new(6), engine, 100);

        service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(acquisitions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_page_recognition_keeps_later_pages() {
        let mut engine = EchoEngine::new();
        engine.fail_on = Some("page 2");
        let service = service(FixedText(Ok("")), FakeRasterizer::new(3), engine, 100);

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(
            result.text,
            "--- Page 1 ---\n\npage 1\n\n--- Page 2 ---\n\n\n\n--- Page 3 ---\n\npage 3"
        );
    }

    #[tokio::test]
    async fn timed_out_steps_count_as_failures() {
        let mut rasterizer = FakeRasterizer::new(5);
        rasterizer.hung_page = Some(3);
        let rendered = rasterizer.rendered.clone();
        let mut engine = EchoEngine::new();
        engine.hang_on = Some("page 2");
        let service = ExtractionService::new(
            Arc::new(FixedText(Ok(""))),
            Arc::new(rasterizer),
            Arc::new(engine),
            ExtractionLimits {
                max_pages: 100,
                page_timeout: Duration::from_millis(100),
            },
            Arc::new(ServiceMetrics::new()),
        );

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert_eq!(result.text, "--- Page 1 ---\n\npage 1\n\n--- Page 2 ---");
        assert_eq!(*rendered.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_document_yields_empty_pdf_ocr_text() {
        let service = service(FixedText(Ok("")), FakeRasterizer::new(0), EchoEngine::new(), 100);

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert_eq!(result.text, "");
    }

    #[tokio::test]
    async fn image_is_always_image_ocr() {
        let service = service(FixedText(Ok("")), FakeRasterizer::new(0), EchoEngine::new(), 100);
        let image = Document::new(Vec::new(), MediaKind::Image);

        let result = service
            .extract(Some(image), ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(result.source, ExtractionSource::ImageOcr);
        assert_eq!(result.text, "");
    }

    #[tokio::test]
    async fn unavailable_engine_degrades_to_empty_text() {
        let mut engine = EchoEngine::new();
        engine.available = false;
        let service = service(FixedText(Ok("")), FakeRasterizer::new(2), engine, 100);

        let image = Document::new(b"scan".to_vec(), MediaKind::Image);
        let result = service
            .extract(Some(image), ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(result.source, ExtractionSource::ImageOcr);
        assert_eq!(result.text, "");

        let result = service.extract(pdf(), ExtractOptions::default()).await.unwrap();
        assert_eq!(result.source, ExtractionSource::PdfOcr);
        assert_eq!(result.text, "");
    }

    #[tokio::test]
    async fn direct_pdf_extraction_requires_input() {
        let service = service(FixedText(Ok("x")), FakeRasterizer::new(0), EchoEngine::new(), 100);
        assert!(matches!(
            service.extract_pdf_text(None).await,
            Err(ExtractionError::MissingDocument)
        ));
        let output = service.extract_pdf_text(Some(b"%PDF".as_slice())).await.unwrap();
        assert_eq!(output.text, "x");
        assert_eq!(output.pages, 1);
    }
}
