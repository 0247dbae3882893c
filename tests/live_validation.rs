use std::{env, sync::Arc};

use docsum::{
    config::Config,
    extraction::{Document, ExtractOptions, ExtractionService, ExtractionSource, MediaKind},
    metrics::ServiceMetrics,
    summarization::{LengthTier, SummaryMethod, SummaryRequest, SummaryService},
};

const ARTICLE: &str = "The Rust programming language guarantees memory safety without a garbage collector. \
Ownership and borrowing rules are checked at compile time. \
These rules prevent data races in concurrent programs. \
Many teams adopt Rust for systems software where reliability matters.";

/// Read a fixture whose path is given by the environment variable `var`.
fn fixture(var: &str) -> Option<Vec<u8>> {
    let path = env::var(var).ok()?;
    std::fs::read(path).ok()
}

#[tokio::test]
#[ignore = "Requires tesseract and pdftoppm on PATH plus DOCSUM_LIVE_SCANNED_PDF"]
async fn live_scanned_pdf_is_recognized() {
    let Some(pdf) = fixture("DOCSUM_LIVE_SCANNED_PDF") else {
        panic!("set DOCSUM_LIVE_SCANNED_PDF to a scanned PDF");
    };
    let service = ExtractionService::from_config(&Config::default(), Arc::new(ServiceMetrics::new()));
    let result = service
        .extract(
            Some(Document::new(pdf, MediaKind::Pdf)),
            ExtractOptions { force_ocr: true },
        )
        .await
        .expect("extraction result");

    assert_eq!(result.source, ExtractionSource::PdfOcr);
    assert!(
        result.text.starts_with("--- Page 1 ---"),
        "page markers expected: {:?}",
        result.text
    );
}

#[tokio::test]
#[ignore = "Requires tesseract on PATH plus DOCSUM_LIVE_IMAGE"]
async fn live_image_is_recognized() {
    let Some(image) = fixture("DOCSUM_LIVE_IMAGE") else {
        panic!("set DOCSUM_LIVE_IMAGE to a PNG containing text");
    };
    let service = ExtractionService::from_config(&Config::default(), Arc::new(ServiceMetrics::new()));
    let result = service
        .extract(
            Some(Document::new(image, MediaKind::Image)),
            ExtractOptions::default(),
        )
        .await
        .expect("extraction result");

    assert_eq!(result.source, ExtractionSource::ImageOcr);
    assert!(!result.text.trim().is_empty(), "expected recognized text");
}

#[tokio::test]
#[ignore = "Requires HUGGINGFACE_API_KEY or COHERE_API_KEY"]
async fn live_hosted_summary() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env().expect("valid environment");
    assert!(
        config.huggingface_api_key.is_some() || config.cohere_api_key.is_some(),
        "a hosted provider credential is required"
    );

    let service = SummaryService::from_config(&config, Arc::new(ServiceMetrics::new()));
    let request =
        SummaryRequest::new(Some(ARTICLE.to_string()), LengthTier::Short).expect("valid request");
    let result = service.summarize(request).await.expect("summary");

    assert!(
        matches!(
            result.method,
            SummaryMethod::HuggingFace | SummaryMethod::Cohere
        ),
        "hosted provider should answer, got {:?}",
        result.method
    );
    assert!(!result.summary.is_empty());
}
