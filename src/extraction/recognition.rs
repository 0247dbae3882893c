//! Optical text recognition adapter.
//!
//! The engine is acquired once per document as a [`RecognitionSession`] and reused across the
//! page loop. Dropping the session releases it, so every exit path of the caller releases the
//! engine.

use super::types::RecognitionError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Interface implemented by recognition backends.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Initialize the engine with its language model for one document.
    async fn acquire(&self) -> Result<Box<dyn RecognitionSession>, RecognitionError>;
}

/// An initialized engine able to recognize images one at a time.
#[async_trait]
pub trait RecognitionSession: Send {
    /// Recognize the text in one encoded image. Blank images yield an empty string.
    async fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError>;
}

/// Recognition engine driving the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    language: String,
}

impl TesseractEngine {
    /// Build an engine invoking `command` with the given language model.
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    async fn installed_languages(&self) -> Result<Vec<String>, RecognitionError> {
        let output = Command::new(&self.command)
            .arg("--list-langs")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                RecognitionError::Unavailable(format!("failed to run {}: {error}", self.command))
            })?;
        if !output.status.success() {
            return Err(RecognitionError::Unavailable(format!(
                "{} --list-langs exited with {}",
                self.command, output.status
            )));
        }
        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn acquire(&self) -> Result<Box<dyn RecognitionSession>, RecognitionError> {
        let languages = self.installed_languages().await?;
        if !languages.iter().any(|language| language == &self.language) {
            return Err(RecognitionError::Unavailable(format!(
                "language model '{}' is not installed",
                self.language
            )));
        }
        tracing::debug!(language = %self.language, "Recognition engine acquired");
        Ok(Box::new(TesseractSession {
            command: self.command.clone(),
            language: self.language.clone(),
        }))
    }
}

struct TesseractSession {
    command: String,
    language: String,
}

#[async_trait]
impl RecognitionSession for TesseractSession {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, RecognitionError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                RecognitionError::Failed(format!("failed to run {}: {error}", self.command))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(|error| RecognitionError::Failed(format!("failed to pipe image: {error}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|error| RecognitionError::Failed(error.to_string()))?;
        if !output.status.success() {
            return Err(RecognitionError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Drop for TesseractSession {
    fn drop(&mut self) {
        tracing::debug!(language = %self.language, "Recognition engine released");
    }
}

/// Parse `tesseract --list-langs` output, skipping the header line.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}
