//! Bookmark creation form.
//!
//! Submitting issues exactly one insert for the current owner. The form never
//! touches the list; the new row shows up when the change feed reports it.

use tracing::{debug, warn};

use crate::services::bookmark_store::BookmarkStoreTrait;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::FormError;
use crate::types::view::FormModel;

pub const TITLE_FIELD: &str = "title";
pub const URL_FIELD: &str = "url";

/// Form state for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkForm {
    owner_id: String,
    title: String,
    url: String,
    saving: bool,
    missing: Vec<String>,
    error: Option<String>,
}

impl BookmarkForm {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            title: String::new(),
            url: String::new(),
            saving: false,
            missing: Vec::new(),
            error: None,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Fields flagged by the last required-field check.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Inline error from the last failed insert.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn check_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push(TITLE_FIELD.to_string());
        }
        if self.url.trim().is_empty() {
            missing.push(URL_FIELD.to_string());
        }
        missing
    }

    /// Validates and submits the form.
    ///
    /// Empty (after trimming) fields block submission without calling the
    /// store. On success the fields are cleared; on failure they are kept and
    /// the store's message is shown inline.
    pub async fn submit<S: BookmarkStoreTrait>(
        &mut self,
        store: &S,
    ) -> Result<Bookmark, FormError> {
        self.missing = self.check_required();
        if !self.missing.is_empty() {
            debug!(missing = ?self.missing, "submission blocked");
            return Err(FormError::Required(self.missing.clone()));
        }

        self.saving = true;
        self.error = None;

        let new = NewBookmark {
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
            user_id: self.owner_id.clone(),
        };
        let result = store.insert(new).await;
        self.saving = false;

        match result {
            Ok(bookmark) => {
                self.title.clear();
                self.url.clear();
                Ok(bookmark)
            }
            Err(e) => {
                warn!(owner_id = %self.owner_id, error = %e, "insert failed");
                self.error = Some(e.to_string());
                Err(FormError::InsertFailed(e.to_string()))
            }
        }
    }

    pub fn render(&self) -> FormModel {
        FormModel {
            title: self.title.clone(),
            url: self.url.clone(),
            saving: self.saving,
            missing: self.missing.clone(),
            error: self.error.clone(),
        }
    }
}
