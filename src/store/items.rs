use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::Store;
use super::types::{
    ExtractedContent, ItemFilter, ItemStatus, SavedItem, StoreError, from_millis, to_millis,
};

const ITEM_COLUMNS: &str = "id, url, title, content, og_image, author, published_at, summary, \
                            tags, status, user_id, created_at";

#[derive(FromRow)]
struct ItemRow {
    id: String,
    url: String,
    title: Option<String>,
    content: Option<String>,
    og_image: Option<String>,
    author: Option<String>,
    published_at: Option<i64>,
    summary: Option<String>,
    tags: String,
    status: String,
    user_id: String,
    created_at: i64,
}

impl ItemRow {
    fn into_item(self) -> Result<SavedItem, StoreError> {
        let status = self
            .status
            .parse()
            .map_err(|()| StoreError::Corrupt(format!("unknown status {}", self.status)))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|error| StoreError::Corrupt(format!("tags for {}: {error}", self.id)))?;

        Ok(SavedItem {
            published_at: self.published_at.map(from_millis).transpose()?,
            created_at: from_millis(self.created_at)?,
            id: self.id,
            url: self.url,
            title: self.title,
            content: self.content,
            og_image: self.og_image,
            author: self.author,
            summary: self.summary,
            tags,
            status,
            user_id: self.user_id,
        })
    }
}

impl Store {
    /// Insert a fresh item in a non-terminal status.
    pub async fn create_item(
        &self,
        user_id: &str,
        url: &str,
        status: ItemStatus,
    ) -> Result<SavedItem, StoreError> {
        debug_assert!(!status.is_terminal());
        let id = Uuid::new_v4().to_string();
        let created_at = to_millis(OffsetDateTime::now_utc());

        let row: ItemRow = sqlx::query_as(&format!(
            "INSERT INTO saved_items (id, url, tags, status, user_id, created_at) \
             VALUES (?, ?, '[]', ?, ?, ?) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&id)
        .bind(url)
        .bind(status.as_str())
        .bind(user_id)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(item_id = %id, url, status = %status, "Item created");
        row.into_item()
    }

    /// Move a non-terminal item to `COMPLETED`, writing every extracted field at once.
    pub async fn complete_item(
        &self,
        id: &str,
        extracted: &ExtractedContent,
    ) -> Result<SavedItem, StoreError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "UPDATE saved_items \
             SET title = ?, content = ?, og_image = ?, author = ?, published_at = ?, status = ? \
             WHERE id = ? AND status IN ('PENDING', 'PROCESSING') \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&extracted.title)
        .bind(&extracted.content)
        .bind(&extracted.og_image)
        .bind(&extracted.author)
        .bind(extracted.published_at.map(to_millis))
        .bind(ItemStatus::Completed.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotTransitionable(id.to_string()))?
            .into_item()
    }

    /// Move a non-terminal item to `FAILED` without touching its other fields.
    pub async fn fail_item(&self, id: &str) -> Result<SavedItem, StoreError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "UPDATE saved_items SET status = ? \
             WHERE id = ? AND status IN ('PENDING', 'PROCESSING') \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(ItemStatus::Failed.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotTransitionable(id.to_string()))?
            .into_item()
    }

    /// Fetch one item owned by `user_id`.
    pub async fn get_item(&self, user_id: &str, id: &str) -> Result<Option<SavedItem>, StoreError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM saved_items WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ItemRow::into_item).transpose()
    }

    /// List items owned by `user_id`, newest first.
    pub async fn list_items(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<SavedItem>, StoreError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM saved_items \
             WHERE user_id = ? AND (? IS NULL OR status = ?) \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .bind(filter.status.map(ItemStatus::as_str))
        .bind(filter.status.map(ItemStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = row.into_item()?;
            if filter.matches_text(&item) {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Persist a summary and its tags on an item owned by `user_id`.
    pub async fn save_summary(
        &self,
        user_id: &str,
        id: &str,
        summary: &str,
        tags: &[String],
    ) -> Result<Option<SavedItem>, StoreError> {
        let encoded = serde_json::to_string(tags)
            .map_err(|error| StoreError::Corrupt(format!("tags for {id}: {error}")))?;

        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "UPDATE saved_items SET summary = ?, tags = ? \
             WHERE id = ? AND user_id = ? \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(summary)
        .bind(encoded)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ItemRow::into_item).transpose()
    }
}
