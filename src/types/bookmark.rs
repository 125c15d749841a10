use serde::{Deserialize, Serialize};

/// A saved bookmark row, as stored by the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub user_id: String,
    /// Unix milliseconds, assigned by the store.
    pub created_at: i64,
}

/// A bookmark about to be inserted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub user_id: String,
}
