//! Shared types used by the extraction client and its callers.

use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the content-extraction API.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid extraction service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service responded with an unexpected status code.
    #[error("Unexpected extraction response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The service answered but reported that the operation failed.
    #[error("Extraction rejected: {0}")]
    Rejected(String),
    /// Request or response JSON could not be built or decoded.
    #[error("Malformed extraction payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structured fields requested from the extraction service alongside the markdown body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    /// Author byline, when the page exposes one.
    #[serde(default)]
    pub author: Option<String>,
    /// Publication timestamp as written on the page.
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Content and metadata extracted from a single page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    /// Main content rendered as markdown.
    pub markdown: Option<String>,
    /// Page title from the document metadata.
    pub title: Option<String>,
    /// Preview image advertised through Open Graph metadata.
    pub og_image: Option<String>,
    /// Author and publication date fields.
    pub fields: ExtractedFields,
}

/// A URL returned by the map or search operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebLink {
    /// Absolute URL of the result.
    pub url: String,
    /// Result title, if the service provided one.
    pub title: Option<String>,
    /// Short description or snippet.
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ScrapeResponse {
    #[serde(default = "default_success")]
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) data: Option<ScrapeData>,
}

#[derive(Deserialize)]
pub(crate) struct ScrapeData {
    #[serde(default)]
    pub(crate) markdown: Option<String>,
    #[serde(default)]
    pub(crate) metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub(crate) json: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct MapResponse {
    #[serde(default = "default_success")]
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) links: Vec<LinkEntry>,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default = "default_success")]
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) data: Option<SearchData>,
}

/// Search results arrive either grouped by source or as a flat list, depending on API version.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum SearchData {
    Grouped {
        #[serde(default)]
        web: Vec<LinkEntry>,
    },
    Flat(Vec<LinkEntry>),
}

/// Links arrive either as bare strings or as objects, depending on API version.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum LinkEntry {
    Bare(String),
    Detailed {
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<LinkEntry> for WebLink {
    fn from(entry: LinkEntry) -> Self {
        match entry {
            LinkEntry::Bare(url) => Self {
                url,
                title: None,
                description: None,
            },
            LinkEntry::Detailed {
                url,
                title,
                description,
            } => Self {
                url,
                title,
                description,
            },
        }
    }
}

fn default_success() -> bool {
    true
}
