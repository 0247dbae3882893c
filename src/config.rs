use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_HUGGINGFACE_MODEL: &str = "facebook/bart-large-cnn";
const DEFAULT_COHERE_URL: &str = "https://api.cohere.ai";
const DEFAULT_COHERE_MODEL: &str = "summarize-medium";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TESSERACT_CMD: &str = "tesseract";
const DEFAULT_PDFTOPPM_CMD: &str = "pdftoppm";
const DEFAULT_OCR_LANGUAGE: &str = "eng";
const DEFAULT_OCR_RASTER_DPI: u32 = 150;
/// Safety ceiling on the number of pages rasterized for a single PDF.
pub const DEFAULT_OCR_MAX_PAGES: u32 = 100;
const DEFAULT_OCR_PAGE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_MAX_PDF_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docsum server and CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Credential for the Hugging Face inference API; the provider is skipped when absent.
    pub huggingface_api_key: Option<String>,
    /// Base URL of the Hugging Face inference API.
    pub huggingface_api_url: String,
    /// Summarization model served by Hugging Face.
    pub huggingface_model: String,
    /// Credential for the Cohere API; the provider is skipped when absent.
    pub cohere_api_key: Option<String>,
    /// Base URL of the Cohere API.
    pub cohere_api_url: String,
    /// Cohere summarization model identifier.
    pub cohere_model: String,
    /// Upper bound for a single hosted summarization call.
    pub provider_timeout: Duration,
    /// Path or name of the `tesseract` executable.
    pub tesseract_cmd: String,
    /// Path or name of the poppler `pdftoppm` executable.
    pub pdftoppm_cmd: String,
    /// Language model loaded into the recognition engine.
    pub ocr_language: String,
    /// Rasterization resolution for scanned PDF pages.
    pub ocr_raster_dpi: u32,
    /// Maximum number of PDF pages sent through recognition.
    pub ocr_max_pages: u32,
    /// Upper bound for rasterizing or recognizing one page.
    pub ocr_page_timeout: Duration,
    /// Maximum accepted upload size for the OCR route.
    pub max_upload_bytes: usize,
    /// Maximum accepted upload size for the direct PDF route.
    pub max_pdf_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            huggingface_api_key: None,
            huggingface_api_url: DEFAULT_HUGGINGFACE_URL.to_string(),
            huggingface_model: DEFAULT_HUGGINGFACE_MODEL.to_string(),
            cohere_api_key: None,
            cohere_api_url: DEFAULT_COHERE_URL.to_string(),
            cohere_model: DEFAULT_COHERE_MODEL.to_string(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            tesseract_cmd: DEFAULT_TESSERACT_CMD.to_string(),
            pdftoppm_cmd: DEFAULT_PDFTOPPM_CMD.to_string(),
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            ocr_raster_dpi: DEFAULT_OCR_RASTER_DPI,
            ocr_max_pages: DEFAULT_OCR_MAX_PAGES,
            ocr_page_timeout: Duration::from_secs(DEFAULT_OCR_PAGE_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_pdf_upload_bytes: DEFAULT_MAX_PDF_UPLOAD_BYTES,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    ///
    /// Every variable is optional. Missing provider credentials are not an error: they only
    /// shorten the summarization chain down to the local extractive path.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            huggingface_api_key: load_env_optional("HUGGINGFACE_API_KEY"),
            huggingface_api_url: load_env_optional("HUGGINGFACE_API_URL")
                .unwrap_or(defaults.huggingface_api_url),
            huggingface_model: load_env_optional("HUGGINGFACE_MODEL")
                .unwrap_or(defaults.huggingface_model),
            cohere_api_key: load_env_optional("COHERE_API_KEY"),
            cohere_api_url: load_env_optional("COHERE_API_URL").unwrap_or(defaults.cohere_api_url),
            cohere_model: load_env_optional("COHERE_MODEL").unwrap_or(defaults.cohere_model),
            provider_timeout: parse_env::<u64>("PROVIDER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            tesseract_cmd: load_env_optional("TESSERACT_CMD").unwrap_or(defaults.tesseract_cmd),
            pdftoppm_cmd: load_env_optional("PDFTOPPM_CMD").unwrap_or(defaults.pdftoppm_cmd),
            ocr_language: load_env_optional("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            ocr_raster_dpi: parse_env("OCR_RASTER_DPI")?.unwrap_or(defaults.ocr_raster_dpi),
            ocr_max_pages: parse_env("OCR_MAX_PAGES")?.unwrap_or(defaults.ocr_max_pages),
            ocr_page_timeout: parse_env::<u64>("OCR_PAGE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.ocr_page_timeout),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            max_pdf_upload_bytes: parse_env("MAX_PDF_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_pdf_upload_bytes),
            server_port: parse_env("SERVER_PORT")?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        huggingface = config.huggingface_api_key.is_some(),
        cohere = config.cohere_api_key.is_some(),
        ocr_language = %config.ocr_language,
        ocr_max_pages = config.ocr_max_pages,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
