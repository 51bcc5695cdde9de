//! In-memory doubles shared by the processing tests.

use super::{service::LibraryService, types::DiscoveryLimits};
use crate::{
    llm::{CompletionRequest, LanguageModel, LlmError, TextStream},
    scraper::{ContentExtractor, ExtractedFields, ScrapeError, ScrapedPage, WebLink},
    store::Store,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default, Clone)]
pub(crate) struct StubExtractor {
    failing: Vec<String>,
    published_at: Option<String>,
}

impl StubExtractor {
    pub(crate) fn failing_on(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|url| url.to_string()).collect(),
            published_at: None,
        }
    }

    pub(crate) fn with_published_at(mut self, value: &str) -> Self {
        self.published_at = Some(value.to_string());
        self
    }
}

#[async_trait]
impl ContentExtractor for StubExtractor {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        if self.failing.iter().any(|failing| failing == url) {
            return Err(ScrapeError::Rejected(format!("cannot reach {url}")));
        }
        Ok(ScrapedPage {
            markdown: Some("# Example Article\n\nBody text.".into()),
            title: Some("Example Article".into()),
            og_image: None,
            fields: ExtractedFields {
                author: None,
                published_at: self.published_at.clone(),
            },
        })
    }

    async fn map(
        &self,
        url: &str,
        _search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WebLink>, ScrapeError> {
        Ok((0..limit)
            .map(|index| WebLink {
                url: format!("{}/page-{index}", url.trim_end_matches('/')),
                title: None,
                description: None,
            })
            .collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebLink>, ScrapeError> {
        Ok((0..limit)
            .map(|index| WebLink {
                url: format!("https://results.example/{index}"),
                title: Some(format!("{query} #{index}")),
                description: None,
            })
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct StubModel {
    answer: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubModel {
    pub(crate) fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Arc::default(),
        }
    }

    pub(crate) async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.prompts.lock().await.push(request.prompt);
        Ok(self.answer.clone())
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
        self.prompts.lock().await.push(request.prompt);
        let chunks: Vec<Result<String, LlmError>> = self
            .answer
            .split_inclusive(' ')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}

pub(crate) async fn service_with(extractor: StubExtractor, model: StubModel) -> LibraryService {
    let store = Store::connect("sqlite::memory:").await.expect("store");
    LibraryService::new(
        store,
        Arc::new(extractor),
        Arc::new(model),
        DiscoveryLimits::default(),
    )
}
