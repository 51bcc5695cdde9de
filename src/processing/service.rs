//! Library service coordinating extraction, persistence, and language-model calls.

use crate::{
    llm::{LanguageModel, TextStream},
    metrics::{ImportMetrics, MetricsSnapshot},
    processing::{
        bulk,
        dates::parse_published_at,
        prompts,
        sanitize::{normalize_tags, sanitize_string, validate_url, validate_urls},
        types::{DiscoveryLimits, DiscoveryResult, LibraryError, ProgressStream},
    },
    scraper::{ContentExtractor, ScrapeError},
    store::{ExtractedContent, ItemFilter, ItemStatus, SavedItem, Session, Store, StoreError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the long-lived handles every operation needs: the store, the extraction client, the
/// language model, and the import counters.
///
/// Construct it once near process start. Clones share every handle, which lets a bulk import
/// keep running on its own task after the request handler returns.
#[derive(Clone)]
pub struct LibraryService {
    store: Store,
    extractor: Arc<dyn ContentExtractor>,
    model: Arc<dyn LanguageModel>,
    metrics: Arc<ImportMetrics>,
    limits: DiscoveryLimits,
}

/// Abstraction over the library operations used by the HTTP surface.
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// Resolve a session cookie token to a live session.
    async fn authenticate(&self, token: &str) -> Result<Option<Session>, LibraryError>;

    /// Import one URL and return the item in its terminal status.
    async fn import_url(&self, user_id: &str, url: &str) -> Result<SavedItem, LibraryError>;

    /// Validate a batch and start importing it in the background.
    fn bulk_import(&self, user_id: &str, urls: Vec<String>)
    -> Result<ProgressStream, LibraryError>;

    /// List the caller's items, newest first.
    async fn list_items(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<SavedItem>, LibraryError>;

    /// Fetch one of the caller's items.
    async fn get_item(&self, user_id: &str, item_id: &str) -> Result<SavedItem, LibraryError>;

    /// Search the web for candidate URLs.
    async fn discover(&self, query: &str) -> Result<Vec<DiscoveryResult>, LibraryError>;

    /// List URLs reachable from a page.
    async fn map_site(
        &self,
        url: &str,
        search: Option<String>,
    ) -> Result<Vec<DiscoveryResult>, LibraryError>;

    /// Stream a summary of one of the caller's items.
    async fn stream_summary(
        &self,
        user_id: &str,
        item_id: &str,
        prompt: Option<String>,
    ) -> Result<TextStream, LibraryError>;

    /// Derive tags from a summary and store both on the item.
    async fn extract_tags(
        &self,
        user_id: &str,
        item_id: &str,
        summary: String,
    ) -> Result<SavedItem, LibraryError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl LibraryService {
    /// Assemble a service from already-initialized handles.
    pub fn new(
        store: Store,
        extractor: Arc<dyn ContentExtractor>,
        model: Arc<dyn LanguageModel>,
        limits: DiscoveryLimits,
    ) -> Self {
        Self {
            store,
            extractor,
            model,
            metrics: Arc::new(ImportMetrics::new()),
            limits,
        }
    }

    pub(crate) fn metrics(&self) -> &ImportMetrics {
        &self.metrics
    }

    /// Import one URL: validate, create the row, extract, and settle on a terminal status.
    pub async fn import_url(&self, user_id: &str, url: &str) -> Result<SavedItem, LibraryError> {
        let url = validate_url(url)?;
        let item = self
            .import_validated(user_id, &url, ItemStatus::Processing)
            .await?;
        tracing::info!(item_id = %item.id, url = %url, status = %item.status, "Single import finished");
        Ok(item)
    }

    /// Start a bulk import. Validation happens before any row is written.
    pub fn bulk_import(
        &self,
        user_id: &str,
        urls: Vec<String>,
    ) -> Result<ProgressStream, LibraryError> {
        let urls = validate_urls(&urls)?;
        Ok(bulk::spawn(self.clone(), user_id.to_string(), urls))
    }

    /// Create a row in `initial` status, extract, then write exactly one terminal update.
    ///
    /// Extraction errors and failed completion writes both settle the row as `FAILED`; only a
    /// store failure that prevents recording any terminal status is returned as an error.
    pub(crate) async fn import_validated(
        &self,
        user_id: &str,
        url: &str,
        initial: ItemStatus,
    ) -> Result<SavedItem, StoreError> {
        let item = self.store.create_item(user_id, url, initial).await?;

        let settled = match self.extract(url).await {
            Ok(extracted) => match self.store.complete_item(&item.id, &extracted).await {
                Ok(done) => done,
                Err(error) => {
                    tracing::warn!(item_id = %item.id, url, error = %error, "Failed to record extraction");
                    self.store.fail_item(&item.id).await?
                }
            },
            Err(error) => {
                tracing::warn!(item_id = %item.id, url, error = %error, "Extraction failed");
                self.store.fail_item(&item.id).await?
            }
        };

        self.metrics
            .record_item(settled.status == ItemStatus::Completed);
        Ok(settled)
    }

    async fn extract(&self, url: &str) -> Result<ExtractedContent, ScrapeError> {
        let page = self.extractor.scrape(url).await?;
        Ok(ExtractedContent {
            title: page.title,
            content: page.markdown,
            og_image: page.og_image,
            author: page.fields.author,
            published_at: parse_published_at(page.fields.published_at.as_deref()),
        })
    }

    /// List the caller's items, newest first.
    pub async fn list_items(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<SavedItem>, LibraryError> {
        Ok(self.store.list_items(user_id, filter).await?)
    }

    /// Fetch one of the caller's items, or [`LibraryError::NotFound`].
    pub async fn get_item(&self, user_id: &str, item_id: &str) -> Result<SavedItem, LibraryError> {
        self.store
            .get_item(user_id, item_id)
            .await?
            .ok_or(LibraryError::NotFound)
    }

    /// Search the web; nothing is persisted.
    pub async fn discover(&self, query: &str) -> Result<Vec<DiscoveryResult>, LibraryError> {
        let query = sanitize_string(Some(query.to_string()))
            .ok_or_else(|| LibraryError::Validation("search query must not be empty".into()))?;
        let results = self.extractor.search(&query, self.limits.search).await?;
        tracing::info!(query = %query, results = results.len(), "Discovery search finished");
        Ok(results)
    }

    /// List URLs reachable from `url`; nothing is persisted.
    pub async fn map_site(
        &self,
        url: &str,
        search: Option<String>,
    ) -> Result<Vec<DiscoveryResult>, LibraryError> {
        let url = validate_url(url)?;
        let search = sanitize_string(search);
        let links = self
            .extractor
            .map(&url, search.as_deref(), self.limits.map)
            .await?;
        tracing::info!(url = %url, search = ?search, links = links.len(), "Site map finished");
        Ok(links)
    }

    /// Stream a summary of `prompt`, or of the item's stored content when no prompt is given.
    pub async fn stream_summary(
        &self,
        user_id: &str,
        item_id: &str,
        prompt: Option<String>,
    ) -> Result<TextStream, LibraryError> {
        let item = self.get_item(user_id, item_id).await?;
        let content = sanitize_string(prompt)
            .or_else(|| sanitize_string(item.content))
            .ok_or_else(|| LibraryError::Validation("item has no content to summarize".into()))?;

        tracing::info!(item_id, chars = content.len(), "Streaming summary");
        Ok(self
            .model
            .stream(prompts::summary_request(&content))
            .await?)
    }

    /// Ask the model for tags, normalize them, and store them with the summary.
    pub async fn extract_tags(
        &self,
        user_id: &str,
        item_id: &str,
        summary: String,
    ) -> Result<SavedItem, LibraryError> {
        let summary = sanitize_string(Some(summary))
            .ok_or_else(|| LibraryError::Validation("summary must not be empty".into()))?;
        self.get_item(user_id, item_id).await?;

        let raw = self.model.complete(prompts::tags_request(&summary)).await?;
        let tags = normalize_tags(&raw);
        tracing::debug!(item_id, raw = %raw, tags = ?tags, "Tags extracted");

        self.store
            .save_summary(user_id, item_id, &summary, &tags)
            .await?
            .ok_or(LibraryError::NotFound)
    }

    /// Return the current import metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl LibraryApi for LibraryService {
    async fn authenticate(&self, token: &str) -> Result<Option<Session>, LibraryError> {
        Ok(self.store.find_session(token).await?)
    }

    async fn import_url(&self, user_id: &str, url: &str) -> Result<SavedItem, LibraryError> {
        LibraryService::import_url(self, user_id, url).await
    }

    fn bulk_import(
        &self,
        user_id: &str,
        urls: Vec<String>,
    ) -> Result<ProgressStream, LibraryError> {
        LibraryService::bulk_import(self, user_id, urls)
    }

    async fn list_items(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<SavedItem>, LibraryError> {
        LibraryService::list_items(self, user_id, filter).await
    }

    async fn get_item(&self, user_id: &str, item_id: &str) -> Result<SavedItem, LibraryError> {
        LibraryService::get_item(self, user_id, item_id).await
    }

    async fn discover(&self, query: &str) -> Result<Vec<DiscoveryResult>, LibraryError> {
        LibraryService::discover(self, query).await
    }

    async fn map_site(
        &self,
        url: &str,
        search: Option<String>,
    ) -> Result<Vec<DiscoveryResult>, LibraryError> {
        LibraryService::map_site(self, url, search).await
    }

    async fn stream_summary(
        &self,
        user_id: &str,
        item_id: &str,
        prompt: Option<String>,
    ) -> Result<TextStream, LibraryError> {
        LibraryService::stream_summary(self, user_id, item_id, prompt).await
    }

    async fn extract_tags(
        &self,
        user_id: &str,
        item_id: &str,
        summary: String,
    ) -> Result<SavedItem, LibraryError> {
        LibraryService::extract_tags(self, user_id, item_id, summary).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        LibraryService::metrics_snapshot(self)
    }
}
