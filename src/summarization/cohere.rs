//! Cohere summarize endpoint client.

use super::{Summarizer, SummarizerError, SummaryMethod, SummaryRequest, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Abstractive summarizer backed by Cohere's summarize endpoint.
pub struct CohereSummarizer {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl CohereSummarizer {
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
        format!("{}/v1/summarize", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct CohereResponse {
    #[serde(default)]
    summary: Option<String>,
}

#[async_trait]
impl Summarizer for CohereSummarizer {
    fn method(&self) -> SummaryMethod {
        SummaryMethod::Cohere
    }

    async fn attempt(&self, request: &SummaryRequest) -> Result<String, SummarizerError> {
        let payload = json!({
            "text": request.text,
            "length": request.length_config().provider_length_hint,
            "format": "paragraph",
            "model": self.model,
            "extractiveness": "medium",
            "temperature": request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_transport_error("Cohere", error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::GenerationFailed(format!(
                "Cohere returned {status}: {body}"
            )));
        }

        let body: CohereResponse = response.json().await.map_err(|error| {
            SummarizerError::InvalidResponse(format!("failed to decode Cohere response: {error}"))
        })?;

        body.summary
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| SummarizerError::InvalidResponse("Cohere response had no summary".into()))
    }
}
