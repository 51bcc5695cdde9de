//! Content-extraction service integration.

pub mod client;
pub mod types;

pub use client::{ContentExtractor, FirecrawlClient};
pub use types::{ExtractedFields, ScrapeError, ScrapedPage, WebLink};
