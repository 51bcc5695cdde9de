#![deny(missing_docs)]

//! Core library for the Linkshelf server: save web pages, extract their content, and organize
//! them with summaries and tags.

/// HTTP routing and REST handlers.
pub mod api;
/// Session-cookie authentication.
pub mod auth;
/// Environment-driven configuration management.
pub mod config;
/// Language-model client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Import metrics helpers.
pub mod metrics;
/// Import, discovery, and summarization workflows.
pub mod processing;
/// Content-extraction client.
pub mod scraper;
/// SQLite persistence for items and sessions.
pub mod store;
