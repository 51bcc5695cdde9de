//! Records persisted by the item store.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised by the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected a query or could not be reached.
    #[error("Database request failed: {0}")]
    Database(#[from] sqlx::Error),
    /// A status transition targeted an item that is missing or already terminal.
    #[error("Item {0} is missing or already in a terminal status")]
    NotTransitionable(String),
    /// A stored row could not be mapped back into a record.
    #[error("Corrupt item row: {0}")]
    Corrupt(String),
}

/// Processing status of a saved item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Row created by a bulk import before its fetch started.
    Pending,
    /// Row created by a single import while its fetch runs.
    Processing,
    /// Extraction succeeded; terminal.
    Completed,
    /// Extraction failed; terminal.
    Failed,
}

impl ItemStatus {
    /// Database and wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further status transitions may happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

/// A saved web page and everything extracted or generated for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    /// Opaque identifier.
    pub id: String,
    /// URL the user submitted.
    pub url: String,
    /// Page title.
    pub title: Option<String>,
    /// Main content as markdown.
    pub content: Option<String>,
    /// Preview image URL.
    pub og_image: Option<String>,
    /// Author byline.
    pub author: Option<String>,
    /// Publication timestamp.
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// AI-generated summary.
    pub summary: Option<String>,
    /// Normalized tags without duplicates.
    pub tags: Vec<String>,
    /// Processing status.
    pub status: ItemStatus,
    /// Owner of the item.
    pub user_id: String,
    /// When the item was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields written when an extraction completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    /// Page title.
    pub title: Option<String>,
    /// Main content as markdown.
    pub content: Option<String>,
    /// Preview image URL.
    pub og_image: Option<String>,
    /// Author byline.
    pub author: Option<String>,
    /// Parsed publication timestamp.
    pub published_at: Option<OffsetDateTime>,
}

/// Narrowing applied when listing a user's items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive text matched against the title and tags.
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    /// Only items with this status; `all` or blank means any.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<ItemStatus>,
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<ItemStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|()| D::Error::custom(format!("unknown status `{value}`"))),
    }
}

impl ItemFilter {
    /// Whether `item` passes the text part of the filter.
    pub fn matches_text(&self, item: &SavedItem) -> bool {
        let Some(needle) = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        let in_title = item
            .title
            .as_deref()
            .is_some_and(|title| title.to_lowercase().contains(&needle));
        in_title || item.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
    }
}

/// An authenticated session issued by the authentication provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Token carried by the session cookie.
    pub token: String,
    /// User the session belongs to.
    pub user_id: String,
    /// Instant after which the session is no longer valid.
    pub expires_at: OffsetDateTime,
}

pub(crate) fn to_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(millis: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|error| StoreError::Corrupt(format!("timestamp {millis}: {error}")))
}
