use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docsum::{
    config,
    extraction::{
        Document, ExtractOptions, ExtractionError, ExtractionResult, ExtractionService, MediaKind,
    },
    logging,
    metrics::ServiceMetrics,
    summarization::{LengthTier, SummaryRequest, SummaryService},
};
use serde_json::{Value, json};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Extract and summarize documents from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from a PDF or image, or from every supported file under a directory.
    Extract {
        path: PathBuf,
        /// Skip the PDF text layer and always rasterize.
        #[arg(long)]
        force_ocr: bool,
    },
    /// Extract and then summarize each supported file.
    Summarize {
        path: PathBuf,
        /// Length tier: short, medium or long.
        #[arg(long, default_value = "medium")]
        tier: String,
        /// Token budget passed to abstractive providers.
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Skip the PDF text layer and always rasterize.
        #[arg(long)]
        force_ocr: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_cli_tracing();

    let config = config::get_config();
    let metrics = Arc::new(ServiceMetrics::new());
    let extraction = ExtractionService::from_config(config, metrics.clone());

    match cli.command {
        Command::Extract { path, force_ocr } => {
            for file in collect_inputs(&path)? {
                let line = match extract_file(&extraction, &file, force_ocr).await {
                    Ok(result) => json!({
                        "path": file.display().to_string(),
                        "text": result.text,
                        "source": result.source,
                    }),
                    Err(err) => failure(&file, &err),
                };
                emit(&line)?;
            }
        }
        Command::Summarize {
            path,
            tier,
            max_tokens,
            force_ocr,
        } => {
            let summaries = SummaryService::from_config(config, metrics.clone());
            let tier = LengthTier::from_label(&tier);
            for file in collect_inputs(&path)? {
                let line = match summarize_file(
                    &extraction,
                    &summaries,
                    &file,
                    tier,
                    max_tokens,
                    force_ocr,
                )
                .await
                {
                    Ok(value) => value,
                    Err(err) => failure(&file, &err),
                };
                emit(&line)?;
            }
        }
    }

    tracing::debug!(metrics = ?metrics.snapshot(), "CLI run finished");
    Ok(())
}

/// Resolve the files to process: the path itself, or every supported file below a directory.
fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
        if entry.file_type().is_file() && mime_for(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    tracing::info!(root = %path.display(), files = files.len(), "Collected input files");
    Ok(files)
}

/// Map a file extension onto the mimetype the upload routes would receive.
fn mime_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

async fn extract_file(
    extraction: &ExtractionService,
    path: &Path,
    force_ocr: bool,
) -> Result<ExtractionResult> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mime = mime_for(path);
    let kind = MediaKind::detect(mime, &bytes).ok_or_else(|| {
        ExtractionError::UnsupportedMediaType(mime.unwrap_or("unknown").to_string())
    })?;
    let result = extraction
        .extract(Some(Document::new(bytes, kind)), ExtractOptions { force_ocr })
        .await?;
    Ok(result)
}

async fn summarize_file(
    extraction: &ExtractionService,
    summaries: &SummaryService,
    path: &Path,
    tier: LengthTier,
    max_tokens: Option<u32>,
    force_ocr: bool,
) -> Result<Value> {
    let extracted = extract_file(extraction, path, force_ocr).await?;
    let request = SummaryRequest::new(Some(extracted.text), tier)?.with_max_tokens(max_tokens);
    let requested_tokens = request.requested_tokens();
    let result = summaries.summarize(request).await?;

    let mut line = json!({
        "path": path.display().to_string(),
        "source": extracted.source,
        "summary": result.summary,
        "method": result.method.as_str(),
        "summaryType": tier.as_str(),
        "requestedTokens": requested_tokens,
        "originalLength": result.original_length,
        "summaryLength": result.summary_length,
    });
    if let Some(warning) = result.warning {
        line["warning"] = json!(warning);
    }
    Ok(line)
}

fn failure(path: &Path, err: &anyhow::Error) -> Value {
    tracing::warn!(path = %path.display(), error = %err, "File failed");
    json!({ "path": path.display().to_string(), "error": err.to_string() })
}

fn emit(line: &Value) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, line).context("failed to write output")?;
    writeln!(stdout).context("failed to write output")?;
    Ok(())
}
