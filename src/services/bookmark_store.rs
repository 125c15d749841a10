//! Persistence collaborator for bookmarks.
//!
//! `LocalBookmarkStore` keeps rows in SQLite via `rusqlite` and announces every
//! committed insert, update and delete on the change feed, scoped to the row's
//! owner.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::change_feed::ChangeFeedHub;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;

/// Trait defining the persistence operations the UI relies on.
#[allow(async_fn_in_trait)]
pub trait BookmarkStoreTrait {
    /// All bookmarks owned by `owner_id`, newest first.
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError>;
    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Bookmark store backed by SQLite, publishing to a [`ChangeFeedHub`].
pub struct LocalBookmarkStore {
    db: Arc<Database>,
    feed: ChangeFeedHub,
}

impl LocalBookmarkStore {
    pub fn new(db: Arc<Database>, feed: ChangeFeedHub) -> Self {
        Self { db, feed }
    }

    /// Returns the current UNIX timestamp in milliseconds.
    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn owner_exists(&self, owner_id: &str) -> Result<bool, StoreError> {
        let count: i64 = self
            .db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM users WHERE id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(count > 0)
    }

    /// Fetches a single bookmark by id.
    pub fn get(&self, id: &str) -> Result<Option<Bookmark>, StoreError> {
        self.db
            .connection()
            .query_row(
                "SELECT id, title, url, user_id, created_at FROM bookmarks WHERE id = ?1",
                params![id],
                Self::row_to_bookmark,
            )
            .optional()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Renames a bookmark and announces the change as an update event.
    ///
    /// The UI has no edit feature; this exists for other writers of the same
    /// store (imports, other clients).
    pub fn update_title(&self, id: &str, title: &str) -> Result<Bookmark, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::Rejected("title must not be empty".to_string()));
        }

        let affected = self
            .db
            .connection()
            .execute(
                "UPDATE bookmarks SET title = ?1 WHERE id = ?2",
                params![title, id],
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let bookmark = self.get(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.feed
            .publish(&bookmark.user_id, ChangeEvent::Update(bookmark.clone()));
        Ok(bookmark)
    }
}

impl BookmarkStoreTrait for LocalBookmarkStore {
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, url, user_id, created_at FROM bookmarks \
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![owner_id], Self::row_to_bookmark)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        debug!(owner_id, count = results.len(), "listed bookmarks");
        Ok(results)
    }

    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError> {
        let title = new.title.trim();
        let url = new.url.trim();
        if title.is_empty() || url.is_empty() {
            return Err(StoreError::Rejected("title and url are required".to_string()));
        }
        if !self.owner_exists(&new.user_id)? {
            return Err(StoreError::Rejected(format!("unknown owner: {}", new.user_id)));
        }

        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            url: url.to_string(),
            user_id: new.user_id,
            created_at: Self::now_millis(),
        };

        self.db
            .connection()
            .execute(
                "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    bookmark.id,
                    bookmark.title,
                    bookmark.url,
                    bookmark.user_id,
                    bookmark.created_at
                ],
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        info!(id = %bookmark.id, owner_id = %bookmark.user_id, "bookmark inserted");
        self.feed
            .publish(&bookmark.user_id, ChangeEvent::Insert(bookmark.clone()));
        Ok(bookmark)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.connection();
        let owner: Option<String> = conn
            .query_row(
                "SELECT user_id FROM bookmarks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let owner = owner.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        conn.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        info!(id, owner_id = %owner, "bookmark deleted");
        self.feed.publish(&owner, ChangeEvent::Delete { id: id.to_string() });
        Ok(())
    }
}
