//! Background pipeline behind bulk imports.
//!
//! URLs are processed one at a time on a spawned task. Each settled item produces exactly one
//! [`BulkImportProgress`] event on a bounded channel; the receiving half is handed back to the
//! caller as a stream. When the caller stops listening, the item in flight still reaches a
//! terminal status, and the remaining URLs are left untouched.

use super::{
    service::LibraryService,
    types::{BulkImportProgress, ProgressStatus, ProgressStream},
};
use crate::store::ItemStatus;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const PROGRESS_BUFFER: usize = 16;

/// Spawn the pipeline for already-validated `urls` and return its progress stream.
pub(crate) fn spawn(service: LibraryService, user_id: String, urls: Vec<String>) -> ProgressStream {
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    tokio::spawn(run(service, user_id, urls, tx));
    Box::pin(ReceiverStream::new(rx))
}

async fn run(
    service: LibraryService,
    user_id: String,
    urls: Vec<String>,
    tx: mpsc::Sender<BulkImportProgress>,
) {
    let total = urls.len();
    tracing::info!(user_id = %user_id, total, "Bulk import started");
    service.metrics().record_batch();

    for (index, url) in urls.into_iter().enumerate() {
        let status = match service
            .import_validated(&user_id, &url, ItemStatus::Pending)
            .await
        {
            Ok(item) if item.status == ItemStatus::Completed => ProgressStatus::Success,
            Ok(_) => ProgressStatus::Failed,
            Err(error) => {
                tracing::error!(url = %url, error = %error, "Bulk import could not record item");
                ProgressStatus::Failed
            }
        };

        let event = BulkImportProgress {
            completed: index + 1,
            total,
            url,
            status,
        };
        if tx.send(event).await.is_err() {
            tracing::info!(
                user_id = %user_id,
                processed = index + 1,
                total,
                "Progress listener went away; stopping bulk import"
            );
            return;
        }
    }

    tracing::info!(user_id = %user_id, total, "Bulk import finished");
}
