//! Local extractive summarization by word-frequency sentence scoring.
//!
//! Sentences are runs of text ending in `.`, `!` or `?`. Words shorter than four characters
//! never count towards a score. Selected sentences are emitted highest score first, not in
//! document order.

use super::{Summarizer, SummarizerError, SummaryMethod, SummaryRequest};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("valid sentence pattern"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word pattern"));

/// Words at or below this length are ignored when counting and scoring.
const MIN_SCORED_WORD_CHARS: usize = 3;

/// Occurrence counts of scored words across one input.
pub type WordFrequencyTable = HashMap<String, u64>;

/// A trimmed sentence with its frequency score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceScore<'a> {
    /// Sentence text, trimmed.
    pub sentence: &'a str,
    /// Sum of the frequencies of the sentence's scored words.
    pub score: u64,
}

/// Keep the `sentences` highest-scoring sentences of `text`, joined by single spaces.
///
/// Text with no more than `sentences` sentences is returned unchanged.
pub fn summarize(text: &str, sentences: usize) -> String {
    let segments = split_sentences(text);
    if segments.len() <= sentences {
        return text.to_string();
    }

    let table = word_frequencies(text);
    let mut scored = score_sentences(&segments, &table);
    // Stable: equal scores keep document order.
    scored.sort_by(|left, right| right.score.cmp(&left.score));

    scored
        .into_iter()
        .take(sentences)
        .map(|entry| entry.sentence)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into sentences, dropping any trailing fragment without a terminator.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Count the scored words of `text`.
pub fn word_frequencies(text: &str) -> WordFrequencyTable {
    let mut table = WordFrequencyTable::new();
    for word in scored_words(text) {
        *table.entry(word).or_insert(0) += 1;
    }
    table
}

/// Score each sentence against a frequency table.
pub fn score_sentences<'a>(
    sentences: &[&'a str],
    table: &WordFrequencyTable,
) -> Vec<SentenceScore<'a>> {
    sentences
        .iter()
        .map(|&sentence| SentenceScore {
            sentence: sentence.trim(),
            score: scored_words(sentence)
                .iter()
                .map(|word| table.get(word).copied().unwrap_or(0))
                .sum(),
        })
        .collect()
}

fn scored_words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| word.chars().count() > MIN_SCORED_WORD_CHARS)
        .map(str::to_string)
        .collect()
}

/// Terminal strategy of the summarization chain. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    /// Summarize synchronously using the request's tier.
    pub fn summarize(&self, request: &SummaryRequest) -> String {
        summarize(&request.text, request.length_config().target_sentences)
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    fn method(&self) -> SummaryMethod {
        SummaryMethod::Extractive
    }

    async fn attempt(&self, request: &SummaryRequest) -> Result<String, SummarizerError> {
        Ok(self.summarize(request))
    }
}
