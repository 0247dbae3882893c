#![deny(missing_docs)]

//! Core library for the docsum document extraction and summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from PDFs and images.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Extraction and summarization counters.
pub mod metrics;
/// Provider-chain summarization with an extractive fallback.
pub mod summarization;
