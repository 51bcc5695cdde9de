use time::OffsetDateTime;

use super::Store;
use super::types::{Session, StoreError, from_millis, to_millis};

impl Store {
    /// Look up an unexpired session by its cookie token.
    pub async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let row: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(to_millis(OffsetDateTime::now_utc()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(token, user_id, expires_at)| {
            Ok(Session {
                token,
                user_id,
                expires_at: from_millis(expires_at)?,
            })
        })
        .transpose()
    }

    /// Record a session issued by the authentication provider.
    pub async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(token) DO UPDATE SET user_id = excluded.user_id, expires_at = excluded.expires_at",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(to_millis(session.expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
