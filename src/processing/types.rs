//! Core data types and error definitions for the library service.

use crate::{llm::LlmError, scraper::ScrapeError, store::StoreError};
use futures_core::Stream;
use serde::Serialize;
use std::pin::Pin;
use thiserror::Error;

pub use crate::scraper::WebLink as DiscoveryResult;

/// Errors emitted by library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The item does not exist or belongs to someone else.
    #[error("Item not found")]
    NotFound,
    /// Caller input was rejected before anything was persisted.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The relational store failed.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),
    /// The extraction service failed outside a per-item import.
    #[error("Extraction service failed: {0}")]
    Extraction(#[from] ScrapeError),
    /// The language model failed.
    #[error("Language model failed: {0}")]
    Model(#[from] LlmError),
}

/// Outcome of one URL within a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// The item reached `COMPLETED`.
    Success,
    /// The item reached `FAILED`, or could not be recorded.
    Failed,
}

/// Progress report emitted after each URL of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkImportProgress {
    /// Number of URLs processed so far, including this one.
    pub completed: usize,
    /// Number of URLs in the batch.
    pub total: usize,
    /// URL this event reports on.
    pub url: String,
    /// Whether the URL was imported.
    pub status: ProgressStatus,
}

/// Ordered progress events of a running bulk import; ends after the last URL.
pub type ProgressStream = Pin<Box<dyn Stream<Item = BulkImportProgress> + Send>>;

/// Result limits applied to discovery calls.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryLimits {
    /// Maximum number of web search results.
    pub search: usize,
    /// Maximum number of mapped links.
    pub map: usize,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self { search: 10, map: 25 }
    }
}
