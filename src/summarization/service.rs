//! Summarization service folding over the provider chain.

use super::{
    ExtractiveSummarizer, Summarizer, SummaryError, SummaryMethod, SummaryRequest, SummaryResult,
    configured_summarizers, types::FALLBACK_WARNING,
};
use crate::{config::Config, metrics::ServiceMetrics};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Ordered hosted providers terminated by the extractive summarizer.
pub struct ProviderChain {
    providers: Vec<Arc<dyn Summarizer>>,
    terminal: ExtractiveSummarizer,
}

impl ProviderChain {
    /// Build a chain trying `providers` in order before the extractive summarizer.
    pub fn new(providers: Vec<Arc<dyn Summarizer>>) -> Self {
        Self {
            providers,
            terminal: ExtractiveSummarizer,
        }
    }

    /// Run the chain, committing to the first provider that returns a non-empty summary.
    pub async fn run(&self, request: &SummaryRequest) -> SummaryResult {
        for provider in &self.providers {
            let method = provider.method();
            match provider.attempt(request).await {
                Ok(summary) if !summary.trim().is_empty() => {
                    tracing::info!(method = method.as_str(), "Summary produced by provider");
                    return SummaryResult::new(&request.text, summary, method);
                }
                Ok(_) => {
                    tracing::warn!(
                        method = method.as_str(),
                        "Provider returned an empty summary; trying next method"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        method = method.as_str(),
                        error = %error,
                        "Provider failed; trying next method"
                    );
                }
            }
        }

        tracing::info!("Used extractive summarization as fallback");
        SummaryResult::new(
            &request.text,
            self.terminal.summarize(request),
            SummaryMethod::Extractive,
        )
    }
}

/// Entry point of the summarization pipeline shared by the HTTP surface and the CLI.
pub struct SummaryService {
    chain: Arc<ProviderChain>,
    metrics: Arc<ServiceMetrics>,
}

impl SummaryService {
    /// Build a service over an explicit provider list.
    pub fn new(providers: Vec<Arc<dyn Summarizer>>, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            chain: Arc::new(ProviderChain::new(providers)),
            metrics,
        }
    }

    /// Build a service with every provider that has a credential in `config`.
    pub fn from_config(config: &Config, metrics: Arc<ServiceMetrics>) -> Self {
        Self::new(configured_summarizers(config), metrics)
    }

    /// Summarize a validated request.
    ///
    /// The chain runs in its own task; if it dies unexpectedly the extractive summarizer is
    /// run once more and tagged `extractive_fallback`. Only when that also fails is
    /// [`SummaryError::Exhausted`] returned.
    pub async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResult, SummaryError> {
        tracing::info!(
            tier = request.tier.as_str(),
            chars = request.text.chars().count(),
            requested_tokens = request.requested_tokens(),
            "Summarizing text"
        );

        let chain = Arc::clone(&self.chain);
        let attempt = request.clone();
        let result = match tokio::spawn(async move { chain.run(&attempt).await }).await {
            Ok(result) => Ok(result),
            Err(error) => {
                tracing::error!(error = %error, "Summarization chain failed; using extractive fallback");
                emergency_fallback(&request)
            }
        };

        if let Ok(result) = &result {
            self.metrics.record_summary(result.method);
        }
        result
    }
}

fn emergency_fallback(request: &SummaryRequest) -> Result<SummaryResult, SummaryError> {
    match catch_unwind(AssertUnwindSafe(|| ExtractiveSummarizer.summarize(request))) {
        Ok(summary) => {
            let mut result =
                SummaryResult::new(&request.text, summary, SummaryMethod::ExtractiveFallback);
            result.warning = Some(FALLBACK_WARNING);
            Ok(result)
        }
        Err(_) => {
            tracing::error!("Extractive fallback failed");
            Err(SummaryError::Exhausted)
        }
    }
}
