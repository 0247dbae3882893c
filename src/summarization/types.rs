//! Request, result, and error types for the summarization pipeline.

use super::length::{LengthConfig, LengthTier};
use serde::Serialize;
use thiserror::Error;

/// Shortest text accepted for summarization, in characters.
pub const MIN_TEXT_CHARS: usize = 100;
/// Longest text accepted for summarization, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Rejections of malformed summarization input. Each carries a distinct caller-facing message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No text was supplied.
    #[error("Text is required in request body")]
    MissingText,
    /// Text is below [`MIN_TEXT_CHARS`].
    #[error("Text must be at least 100 characters long for meaningful summarization")]
    TooShort,
    /// Text is above [`MAX_TEXT_CHARS`].
    #[error("Text is too long. Maximum 10,000 characters allowed.")]
    TooLong,
}

/// Validated input to the summarization chain.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    /// Text to summarize, between 100 and 10,000 characters.
    pub text: String,
    /// Requested length tier.
    pub tier: LengthTier,
    /// Explicit token budget overriding the tier's target.
    pub max_tokens: Option<u32>,
    /// Sampling temperature for providers that accept one.
    pub temperature: Option<f32>,
}

impl SummaryRequest {
    /// Validate raw input and build a request.
    pub fn new(text: Option<String>, tier: LengthTier) -> Result<Self, ValidationError> {
        let text = text
            .filter(|text| !text.is_empty())
            .ok_or(ValidationError::MissingText)?;
        let chars = text.chars().count();
        if chars < MIN_TEXT_CHARS {
            return Err(ValidationError::TooShort);
        }
        if chars > MAX_TEXT_CHARS {
            return Err(ValidationError::TooLong);
        }
        Ok(Self {
            text,
            tier,
            max_tokens: None,
            temperature: None,
        })
    }

    /// Override the tier's token budget.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens.filter(|tokens| *tokens > 0);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Targets of the requested tier.
    pub fn length_config(&self) -> &'static LengthConfig {
        self.tier.config()
    }

    /// Token budget actually requested from providers.
    pub fn requested_tokens(&self) -> u32 {
        self.max_tokens
            .unwrap_or(self.length_config().target_tokens)
    }
}

/// Producer of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryMethod {
    /// Hugging Face inference API.
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// Cohere summarize API.
    #[serde(rename = "cohere")]
    Cohere,
    /// Local extractive summarizer at the end of the chain.
    #[serde(rename = "extractive")]
    Extractive,
    /// Local extractive summarizer after the chain failed unexpectedly.
    #[serde(rename = "extractive_fallback")]
    ExtractiveFallback,
}

impl SummaryMethod {
    /// Stable wire tag for the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::Cohere => "cohere",
            Self::Extractive => "extractive",
            Self::ExtractiveFallback => "extractive_fallback",
        }
    }
}

/// Warning attached to summaries produced after an internal failure.
pub const FALLBACK_WARNING: &str = "Used fallback summarization due to API errors";

/// Summary produced by the chain.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    /// Summary text.
    pub summary: String,
    /// Producer that actually generated `summary`.
    pub method: SummaryMethod,
    /// Input length in characters.
    pub original_length: usize,
    /// Summary length in characters.
    pub summary_length: usize,
    /// Set when the summary came from the emergency fallback.
    pub warning: Option<&'static str>,
}

impl SummaryResult {
    pub(crate) fn new(original: &str, summary: String, method: SummaryMethod) -> Self {
        Self {
            original_length: original.chars().count(),
            summary_length: summary.chars().count(),
            summary,
            method,
            warning: None,
        }
    }
}

/// Errors surfaced by [`crate::summarization::SummaryService`].
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Every strategy, including the local fallback, failed.
    #[error("All summarization methods failed. Please try again.")]
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(len: usize) -> Option<String> {
        Some("a".repeat(len))
    }

    #[test]
    fn accepts_inclusive_bounds() {
        assert!(SummaryRequest::new(text_of(100), LengthTier::Short).is_ok());
        assert!(SummaryRequest::new(text_of(10_000), LengthTier::Short).is_ok());
    }

    #[test]
    fn rejects_out_of_bounds_with_distinct_messages() {
        let short = SummaryRequest::new(text_of(99), LengthTier::Short).unwrap_err();
        let long = SummaryRequest::new(text_of(10_001), LengthTier::Short).unwrap_err();
        let missing = SummaryRequest::new(None, LengthTier::Short).unwrap_err();
        assert_eq!(short, ValidationError::TooShort);
        assert_eq!(long, ValidationError::TooLong);
        assert_eq!(missing, ValidationError::MissingText);
        assert_eq!(
            SummaryRequest::new(Some(String::new()), LengthTier::Short).unwrap_err(),
            ValidationError::MissingText
        );

        let messages = [short.to_string(), long.to_string(), missing.to_string()];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(100);
        assert_eq!(text.len(), 200);
        assert!(SummaryRequest::new(Some(text), LengthTier::Medium).is_ok());
    }

    #[test]
    fn explicit_budget_overrides_tier() {
        let request = SummaryRequest::new(text_of(150), LengthTier::Long).unwrap();
        assert_eq!(request.requested_tokens(), 300);
        let request = request.with_max_tokens(Some(42));
        assert_eq!(request.requested_tokens(), 42);
    }

    #[test]
    fn method_tags_match_wire_format() {
        assert_eq!(
            serde_json::to_value(SummaryMethod::HuggingFace).unwrap(),
            serde_json::json!("huggingface")
        );
        assert_eq!(
            serde_json::to_value(SummaryMethod::ExtractiveFallback).unwrap(),
            serde_json::json!("extractive_fallback")
        );
    }
}
