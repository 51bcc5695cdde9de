//! Import, discovery, and summarization workflows built on the store and external clients.

mod bulk;
pub mod dates;
mod prompts;
pub mod sanitize;
mod service;
#[cfg(test)]
mod test_support;
pub mod types;

pub use service::{LibraryApi, LibraryService};
pub use types::{
    BulkImportProgress, DiscoveryLimits, DiscoveryResult, LibraryError, ProgressStatus,
    ProgressStream,
};
