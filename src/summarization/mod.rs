//! Summarization pipeline: hosted abstractive providers with a local extractive fallback.
//!
//! Providers are tried in priority order and the first non-empty summary wins. A provider
//! without a configured credential is never constructed, so an empty environment reduces the
//! chain to the extractive summarizer, which cannot fail.

pub mod cohere;
pub mod extractive;
pub mod huggingface;
pub mod length;
mod service;
pub mod types;

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

pub use cohere::CohereSummarizer;
pub use extractive::ExtractiveSummarizer;
pub use huggingface::HuggingFaceSummarizer;
pub use length::{LengthConfig, LengthTier};
pub use service::{ProviderChain, SummaryService};
pub use types::{
    FALLBACK_WARNING, MAX_TEXT_CHARS, MIN_TEXT_CHARS, SummaryError, SummaryMethod, SummaryRequest,
    SummaryResult, ValidationError,
};

/// Errors surfaced while attempting a summarization strategy.
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// Provider could not be reached or did not answer in time.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no summary.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// One strategy in the summarization chain.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Method tag reported when this strategy produces the summary.
    fn method(&self) -> SummaryMethod;

    /// Try to summarize the request.
    async fn attempt(&self, request: &SummaryRequest) -> Result<String, SummarizerError>;
}

pub(crate) fn map_transport_error(provider: &str, error: reqwest::Error) -> SummarizerError {
    if error.is_timeout() {
        SummarizerError::ProviderUnavailable(format!("{provider} request timed out"))
    } else {
        SummarizerError::ProviderUnavailable(format!("failed to reach {provider}: {error}"))
    }
}

fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent("docsum/summary")
        .timeout(config.provider_timeout)
        .build()
}

/// Build the hosted providers that have credentials, in priority order.
pub fn configured_summarizers(config: &Config) -> Vec<Arc<dyn Summarizer>> {
    let mut providers: Vec<Arc<dyn Summarizer>> = Vec::new();
    if config.huggingface_api_key.is_none() && config.cohere_api_key.is_none() {
        tracing::info!("No summarization credentials configured; using extractive summaries");
        return providers;
    }

    let http = match build_http_client(config) {
        Ok(http) => http,
        Err(error) => {
            tracing::error!(error = %error, "Failed to build HTTP client; hosted summarization disabled");
            return providers;
        }
    };

    if let Some(api_key) = &config.huggingface_api_key {
        providers.push(Arc::new(HuggingFaceSummarizer::new(
            http.clone(),
            config.huggingface_api_url.clone(),
            config.huggingface_model.clone(),
            api_key.clone(),
        )));
    }
    if let Some(api_key) = &config.cohere_api_key {
        providers.push(Arc::new(CohereSummarizer::new(
            http,
            config.cohere_api_url.clone(),
            config.cohere_model.clone(),
            api_key.clone(),
        )));
    }

    tracing::info!(
        providers = ?providers.iter().map(|provider| provider.method().as_str()).collect::<Vec<_>>(),
        "Summarization providers configured"
    );
    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_means_no_providers() {
        assert!(configured_summarizers(&Config::default()).is_empty());
    }

    #[test]
    fn providers_follow_priority_order() {
        let config = Config {
            huggingface_api_key: Some("hf".into()),
            cohere_api_key: Some("co".into()),
            ..Config::default()
        };
        let methods: Vec<_> = configured_summarizers(&config)
            .iter()
            .map(|provider| provider.method())
            .collect();
        assert_eq!(methods, vec![SummaryMethod::HuggingFace, SummaryMethod::Cohere]);
    }

    #[test]
    fn missing_credential_skips_only_that_provider() {
        let config = Config {
            cohere_api_key: Some("co".into()),
            ..Config::default()
        };
        let methods: Vec<_> = configured_summarizers(&config)
            .iter()
            .map(|provider| provider.method())
            .collect();
        assert_eq!(methods, vec![SummaryMethod::Cohere]);
    }

    #[tokio::test]
    async fn slow_provider_times_out_and_chain_moves_on() {
        use httpmock::{Method::POST, MockServer};
        use serde_json::json;
        use std::time::Duration;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/facebook/bart-large-cnn");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!([{ "summary_text": "Too late." }]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/summarize");
                then.status(200).json_body(json!({ "summary": "Cohere was on time." }));
            })
            .await;

        let config = Config {
            huggingface_api_key: Some("hf".into()),
            huggingface_api_url: server.base_url(),
            cohere_api_key: Some("co".into()),
            cohere_api_url: server.base_url(),
            provider_timeout: Duration::from_millis(200),
            ..Config::default()
        };
        let providers = configured_summarizers(&config);
        let request = SummaryRequest::new(Some("word ".repeat(40)), LengthTier::Short)
            .expect("valid request");

        let error = providers[0]
            .attempt(&request)
            .await
            .expect_err("slow provider");
        assert!(
            matches!(error, SummarizerError::ProviderUnavailable(ref message) if message.contains("timed out"))
        );

        let result = ProviderChain::new(providers).run(&request).await;
        assert_eq!(result.method, SummaryMethod::Cohere);
        assert_eq!(result.summary, "Cohere was on time.");
    }
}
