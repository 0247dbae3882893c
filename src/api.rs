//! HTTP surface for docsum.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /api/pdf/extract` – Read the embedded text layer of an uploaded PDF (multipart field
//!   `pdf`). Returns `{ success, text, pages, info }`.
//! - `POST /api/ocr/extract` – Extract text from an uploaded image or PDF (multipart field `pdf`
//!   or `file`), falling back to page-by-page recognition for scanned PDFs. Returns
//!   `{ text, source }`. `?force_ocr=true` skips the PDF text layer.
//! - `POST /api/summary` – Summarize 100–10,000 characters of text. Returns
//!   `{ success, data: { originalLength, summaryLength, summary, method, summaryType, requestedTokens } }`.
//! - `GET /api/metrics` – Observe extraction and summarization counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The CLI shares the same services, so behavior is identical across interfaces.

use crate::{
    config::Config,
    extraction::{
        Document, ExtractOptions, ExtractionError, ExtractionResult, ExtractionService, MediaKind,
    },
    metrics::{MetricsSnapshot, ServiceMetrics},
    summarization::{LengthTier, SummaryRequest, SummaryService, ValidationError},
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, Request, State, multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Shared state behind every route.
pub struct AppState {
    /// Extraction pipeline.
    pub extraction: ExtractionService,
    /// Summarization pipeline.
    pub summaries: SummaryService,
    /// Counters shared by both pipelines.
    pub metrics: Arc<ServiceMetrics>,
    /// Upload size limits.
    pub limits: UploadLimits,
}

/// Maximum request body sizes for the upload routes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Limit for `POST /api/ocr/extract`.
    pub max_upload_bytes: usize,
    /// Limit for `POST /api/pdf/extract`.
    pub max_pdf_upload_bytes: usize,
}

impl AppState {
    /// Build the production state from configuration.
    pub fn from_config(config: &Config) -> Self {
        let metrics = Arc::new(ServiceMetrics::new());
        Self {
            extraction: ExtractionService::from_config(config, metrics.clone()),
            summaries: SummaryService::from_config(config, metrics.clone()),
            metrics,
            limits: UploadLimits {
                max_upload_bytes: config.max_upload_bytes,
                max_pdf_upload_bytes: config.max_pdf_upload_bytes,
            },
        }
    }
}

/// Build the HTTP router exposing the extraction and summarization API surface.
pub fn create_router(state: Arc<AppState>) -> Router {
    let limits = state.limits;
    Router::new()
        .route("/test", get(liveness))
        .route("/api/test", get(liveness))
        .route(
            "/api/pdf/extract",
            post(extract_pdf).layer(DefaultBodyLimit::max(limits.max_pdf_upload_bytes)),
        )
        .route(
            "/api/ocr/extract",
            post(extract_ocr).layer(DefaultBodyLimit::max(limits.max_upload_bytes)),
        )
        .route("/api/summary", post(summarize))
        .route("/api/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .fallback(not_found)
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

/// Wrap every request in a span carrying a fresh request id.
async fn request_span(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    next.run(request).instrument(span).await
}

async fn liveness() -> &'static str {
    "Hello from docsum!"
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
        .into_response()
}

/// A file pulled out of a multipart form.
struct Upload {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// Return the first file found under one of `fields`, draining every other field.
async fn read_upload(
    mut multipart: Multipart,
    fields: &[&str],
) -> Result<Option<Upload>, MultipartError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if upload.is_none() && fields.contains(&name.as_str()) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?.to_vec();
            upload = Some(Upload {
                bytes,
                content_type,
            });
        } else {
            let _ = field.bytes().await?;
        }
    }
    Ok(upload)
}

/// Success response for `POST /api/pdf/extract`.
#[derive(Serialize)]
struct PdfExtractResponse {
    success: bool,
    text: String,
    pages: usize,
    info: BTreeMap<String, String>,
}

/// Read the embedded text layer of an uploaded PDF.
async fn extract_pdf(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PdfExtractResponse>, ApiError> {
    let upload = read_upload(multipart, &["pdf"])
        .await
        .map_err(|error| {
            tracing::warn!(error = %error, "Failed to read PDF upload");
            ApiError::PdfUpload
        })?
        .ok_or(ApiError::PdfMissing)?;

    if MediaKind::detect(upload.content_type.as_deref(), &upload.bytes) != Some(MediaKind::Pdf) {
        return Err(ApiError::PdfOnly);
    }

    let output = state
        .extraction
        .extract_pdf_text(Some(&upload.bytes))
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "PDF extraction error");
            ApiError::PdfFailed
        })?;

    tracing::info!(pages = output.pages, chars = output.text.len(), "PDF text extracted");
    Ok(Json(PdfExtractResponse {
        success: true,
        text: output.text,
        pages: output.pages,
        info: output.info,
    }))
}

/// Query parameters accepted by `POST /api/ocr/extract`.
#[derive(Debug, Default, Deserialize)]
struct OcrParams {
    /// Skip the PDF text layer and always rasterize.
    #[serde(default)]
    force_ocr: bool,
}

/// Extract text from an uploaded image or PDF.
async fn extract_ocr(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OcrParams>,
    multipart: Multipart,
) -> Result<Json<ExtractionResult>, ApiError> {
    let upload = read_upload(multipart, &["pdf", "file"])
        .await
        .map_err(|error| {
            tracing::warn!(error = %error, "Failed to read OCR upload");
            ApiError::OcrUpload
        })?
        .ok_or(ApiError::OcrMissing)?;

    let kind = MediaKind::detect(upload.content_type.as_deref(), &upload.bytes).ok_or_else(|| {
        tracing::info!(content_type = ?upload.content_type, "Rejected unsupported upload");
        ApiError::OcrUnsupported
    })?;

    let result = state
        .extraction
        .extract(
            Some(Document::new(upload.bytes, kind)),
            ExtractOptions {
                force_ocr: params.force_ocr,
            },
        )
        .await
        .map_err(|error: ExtractionError| {
            tracing::error!(error = %error, "OCR error");
            ApiError::OcrFailed
        })?;

    Ok(Json(result))
}

/// Request body for `POST /api/summary`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    summary_type: Option<String>,
    #[serde(default)]
    max_tokens: Option<serde_json::Value>,
    #[serde(default)]
    temperature: Option<f32>,
}

/// Read a token budget sent either as a JSON number or as a string with a leading integer.
/// Zero, negative, and non-numeric budgets count as absent.
fn token_budget(value: &serde_json::Value) -> Option<u32> {
    let budget = match value {
        serde_json::Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 1.0).map(|n| n as u64)),
        serde_json::Value::String(text) => {
            let digits: String = text
                .trim_start()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse::<u64>().ok()
        }
        _ => None,
    }?;
    u32::try_from(budget).ok().filter(|budget| *budget > 0)
}

/// Payload of a successful summary response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    original_length: usize,
    summary_length: usize,
    summary: String,
    method: &'static str,
    summary_type: String,
    requested_tokens: u32,
}

/// Success response for `POST /api/summary`.
#[derive(Serialize)]
struct SummaryResponse {
    success: bool,
    data: SummaryData,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'static str>,
}

/// Summarize text with the provider chain.
async fn summarize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SummaryBody>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::info!(error = %rejection, "Rejected malformed summary request");
        ApiError::MalformedBody
    })?;

    let tier = body
        .summary_type
        .as_deref()
        .map(LengthTier::from_label)
        .unwrap_or_default();
    let request = SummaryRequest::new(body.text, tier)?
        .with_max_tokens(body.max_tokens.as_ref().and_then(token_budget))
        .with_temperature(body.temperature);
    let requested_tokens = request.requested_tokens();

    let result = state.summaries.summarize(request).await.map_err(|error| {
        tracing::error!(error = %error, "Summarization error");
        ApiError::SummaryFailed
    })?;

    tracing::info!(
        method = result.method.as_str(),
        original_length = result.original_length,
        summary_length = result.summary_length,
        "Summary request completed"
    );
    Ok(Json(SummaryResponse {
        success: true,
        data: SummaryData {
            original_length: result.original_length,
            summary_length: result.summary_length,
            summary: result.summary,
            method: result.method.as_str(),
            summary_type: body
                .summary_type
                .unwrap_or_else(|| tier.as_str().to_string()),
            requested_tokens,
        },
        warning: result.warning,
    }))
}

/// Return a snapshot of the extraction and summarization counters.
async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "pdf_extract",
                method: "POST",
                path: "/api/pdf/extract",
                description: "Read the embedded text layer of a PDF uploaded as multipart field `pdf`. Response returns { \"success\": true, \"text\": string, \"pages\": number, \"info\": object }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ocr_extract",
                method: "POST",
                path: "/api/ocr/extract",
                description: "Extract text from an image or PDF uploaded as multipart field `pdf`, recognizing scanned pages. Response returns { \"text\": string, \"source\": \"image-ocr\" | \"pdf-ocr\" | \"pdf-text\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/api/summary",
                description: "Summarize 100 to 10,000 characters of text with hosted providers, falling back to local extractive summarization.",
                request_example: Some(json!({
                    "text": "Text to summarize (at least 100 characters)...",
                    "summaryType": "short",
                    "maxTokens": 75,
                    "temperature": 0.3
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/metrics",
                description: "Return extraction and summarization counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Caller-facing failures. Internal detail is logged where the error is raised, never returned.
#[derive(Debug)]
enum ApiError {
    PdfMissing,
    PdfOnly,
    PdfUpload,
    PdfFailed,
    OcrMissing,
    OcrUnsupported,
    OcrUpload,
    OcrFailed,
    MalformedBody,
    Validation(ValidationError),
    SummaryFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::PdfMissing => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "No PDF provided",
                    "message": "Please provide PDF via file upload"
                }),
            ),
            Self::PdfOnly => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Only PDF files allowed" }),
            ),
            Self::PdfUpload => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Failed to read uploaded file" }),
            ),
            Self::PdfFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": "Failed to extract text from PDF" }),
            ),
            Self::OcrMissing => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "No file uploaded." }),
            ),
            Self::OcrUnsupported => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Unsupported file type." }),
            ),
            Self::OcrUpload => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Failed to read uploaded file" }),
            ),
            Self::OcrFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "OCR failed" }),
            ),
            Self::MalformedBody => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Request body must be valid JSON" }),
            ),
            Self::Validation(error) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": error.to_string() }),
            ),
            Self::SummaryFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "success": false,
                    "error": "All summarization methods failed. Please try again."
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(inner: ValidationError) -> Self {
        Self::Validation(inner)
    }
}
