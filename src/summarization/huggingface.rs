//! Hugging Face inference API summarization client.

use super::{Summarizer, SummarizerError, SummaryMethod, SummaryRequest, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Abstractive summarizer backed by the Hugging Face inference API.
pub struct HuggingFaceSummarizer {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HuggingFaceSummarizer {
    /// Build a client for `model` served under `base_url`.
    pub fn new(http: Client, base_url: String, model: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            model,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct HuggingFaceSummary {
    #[serde(default)]
    summary_text: Option<String>,
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    fn method(&self) -> SummaryMethod {
        SummaryMethod::HuggingFace
    }

    async fn attempt(&self, request: &SummaryRequest) -> Result<String, SummarizerError> {
        let max_length = request.requested_tokens();
        let payload = json!({
            "inputs": request.text,
            "parameters": {
                "max_length": max_length,
                "min_length": (max_length / 3).max(30),
                "do_sample": false,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_transport_error("Hugging Face", error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::GenerationFailed(format!(
                "Hugging Face returned {status}: {body}"
            )));
        }

        let body: Vec<HuggingFaceSummary> = response.json().await.map_err(|error| {
            SummarizerError::InvalidResponse(format!(
                "failed to decode Hugging Face response: {error}"
            ))
        })?;

        body.into_iter()
            .next()
            .and_then(|first| first.summary_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                SummarizerError::InvalidResponse("Hugging Face response had no summary_text".into())
            })
    }
}
