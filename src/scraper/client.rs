//! HTTP client wrapper for the Firecrawl-compatible extraction API.

use crate::scraper::types::{
    ExtractedFields, MapResponse, ScrapeError, ScrapeResponse, ScrapedPage, SearchData,
    SearchResponse, WebLink,
};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Operations the import pipeline and discovery need from an extraction backend.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Fetch a page and extract its main content, metadata, and structured fields.
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;

    /// List URLs discoverable from `url`, optionally narrowed by a search term.
    async fn map(
        &self,
        url: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WebLink>, ScrapeError>;

    /// Run a ranked web search.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebLink>, ScrapeError>;
}

/// Lightweight HTTP client for the extraction service.
pub struct FirecrawlClient {
    client: Client,
    base_url: String,
    api_key: String,
    extract_schema: Value,
}

impl FirecrawlClient {
    /// Construct a client for the service at `base_url`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ScrapeError> {
        let client = Client::builder().user_agent("linkshelf/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(ScrapeError::InvalidUrl)?;
        let extract_schema = serde_json::to_value(schemars::schema_for!(ExtractedFields))?;
        tracing::debug!(
            url = %base_url,
            has_api_key = !api_key.is_empty(),
            "Initialized extraction HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            extract_schema,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.client.request(method, url);
        if self.api_key.is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ScrapeError> {
        let response = self.request(Method::POST, path).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ScrapeError::UnexpectedStatus { status, body };
            tracing::warn!(path, error = %error, "Extraction request failed");
            return Err(error);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentExtractor for FirecrawlClient {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let body = json!({
            "url": url,
            "formats": [
                "markdown",
                { "type": "json", "schema": self.extract_schema },
            ],
            "location": { "country": "US", "languages": ["en"] },
            "onlyMainContent": true,
            "proxy": "auto",
        });

        let response: ScrapeResponse = self.post("v2/scrape", &body).await?;
        if !response.success {
            return Err(ScrapeError::Rejected(
                response.error.unwrap_or_else(|| "scrape unsuccessful".into()),
            ));
        }
        let data = response
            .data
            .ok_or_else(|| ScrapeError::Rejected("scrape returned no data".into()))?;

        let metadata = data.metadata.unwrap_or_default();
        let fields = data.json.as_ref().and_then(Value::as_object);
        let page = ScrapedPage {
            markdown: non_empty(data.markdown),
            title: metadata_string(&metadata, "title"),
            og_image: metadata_string(&metadata, "ogImage"),
            fields: ExtractedFields {
                author: fields.and_then(|fields| field_text(fields, "author")),
                published_at: fields.and_then(published_text),
            },
        };
        tracing::debug!(
            url,
            has_title = page.title.is_some(),
            has_content = page.markdown.is_some(),
            "Page scraped"
        );
        Ok(page)
    }

    async fn map(
        &self,
        url: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WebLink>, ScrapeError> {
        let mut body = json!({
            "url": url,
            "limit": limit,
            "location": { "country": "US", "languages": ["en"] },
        });
        if let (Some(term), Some(obj)) = (search, body.as_object_mut()) {
            obj.insert("search".into(), Value::String(term.to_string()));
        }

        let response: MapResponse = self.post("v2/map", &body).await?;
        if !response.success {
            return Err(ScrapeError::Rejected(
                response.error.unwrap_or_else(|| "map unsuccessful".into()),
            ));
        }
        Ok(response
            .links
            .into_iter()
            .map(WebLink::from)
            .take(limit)
            .collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebLink>, ScrapeError> {
        let body = json!({
            "query": query,
            "limit": limit,
            "location": "US",
        });

        let response: SearchResponse = self.post("v2/search", &body).await?;
        if !response.success {
            return Err(ScrapeError::Rejected(
                response.error.unwrap_or_else(|| "search unsuccessful".into()),
            ));
        }
        let entries = match response.data {
            Some(SearchData::Grouped { web }) => web,
            Some(SearchData::Flat(entries)) => entries,
            None => Vec::new(),
        };
        Ok(entries.into_iter().map(WebLink::from).take(limit).collect())
    }
}

fn normalize_base_url(raw: &str) -> Result<String, String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|error| format!("{raw}: {error}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.as_str().trim_end_matches('/').to_string()),
        other => Err(format!("{raw}: unsupported scheme {other}")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    })
}

/// Metadata values are usually strings but some pages yield arrays; take the first string.
fn metadata_string(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match metadata.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Array(values) => values
            .iter()
            .find_map(|value| value.as_str().map(str::to_string)),
        _ => None,
    };
    non_empty(value)
}

/// Structured fields come from a model, so each key is read on its own and off-type values
/// are dropped without discarding their neighbours.
fn field_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(text) => non_empty(Some(text.clone())),
        Value::Null => None,
        other => {
            tracing::debug!(key, value = %other, "Ignoring non-text extracted field");
            None
        }
    }
}

/// Numeric publication dates are epoch milliseconds; render them as RFC 3339.
fn published_text(fields: &Map<String, Value>) -> Option<String> {
    let Some(Value::Number(number)) = fields.get("publishedAt") else {
        return field_text(fields, "publishedAt");
    };
    let rendered = number
        .as_i64()
        .or_else(|| number.as_f64().map(|millis| millis as i64))
        .and_then(|millis| {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        })
        .and_then(|instant| instant.format(&Rfc3339).ok());
    if rendered.is_none() {
        tracing::debug!(value = %number, "Ignoring out-of-range numeric publication date");
    }
    rendered
}
