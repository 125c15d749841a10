use serde::{Deserialize, Serialize};

use super::bookmark::Bookmark;

/// A row-level change pushed by the change feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeEvent {
    Insert(Bookmark),
    Update(Bookmark),
    Delete { id: String },
}

impl ChangeEvent {
    /// Identifier of the row this event refers to.
    pub fn row_id(&self) -> &str {
        match self {
            ChangeEvent::Insert(b) | ChangeEvent::Update(b) => &b.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}
