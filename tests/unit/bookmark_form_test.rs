//! Unit tests for the bookmark creation form.

use std::cell::{Cell, RefCell};

use rstest::rstest;
use smart_bookmark::managers::bookmark_form::BookmarkForm;
use smart_bookmark::services::bookmark_store::BookmarkStoreTrait;
use smart_bookmark::types::bookmark::{Bookmark, NewBookmark};
use smart_bookmark::types::errors::{FormError, StoreError};

/// Store double that records inserts and can be told to refuse them.
#[derive(Default)]
struct RecordingStore {
    inserted: RefCell<Vec<NewBookmark>>,
    fail_with: RefCell<Option<StoreError>>,
    calls: Cell<usize>,
}

impl BookmarkStoreTrait for RecordingStore {
    async fn list_for_owner(&self, _owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        Ok(Vec::new())
    }

    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(err) = self.fail_with.borrow().clone() {
            return Err(err);
        }
        self.inserted.borrow_mut().push(new.clone());
        Ok(Bookmark {
            id: format!("bm-{}", self.calls.get()),
            title: new.title,
            url: new.url,
            user_id: new.user_id,
            created_at: 1_700_000_000_000,
        })
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

fn filled(title: &str, url: &str) -> BookmarkForm {
    let mut form = BookmarkForm::new("u1");
    form.set_title(title);
    form.set_url(url);
    form
}

#[tokio::test]
async fn test_submit_inserts_once_for_owner() {
    let store = RecordingStore::default();
    let mut form = filled("  Tokio  ", " https://tokio.rs ");

    let bookmark = form.submit(&store).await.unwrap();
    assert_eq!(bookmark.title, "Tokio");
    assert_eq!(store.calls.get(), 1);
    assert_eq!(
        store.inserted.borrow()[0],
        NewBookmark {
            title: "Tokio".to_string(),
            url: "https://tokio.rs".to_string(),
            user_id: "u1".to_string(),
        }
    );
}

#[tokio::test]
async fn test_success_clears_fields() {
    let store = RecordingStore::default();
    let mut form = filled("Tokio", "https://tokio.rs");

    form.submit(&store).await.unwrap();
    assert_eq!(form.title(), "");
    assert_eq!(form.url(), "");
    assert!(!form.is_saving());
    assert!(form.error().is_none());
}

#[rstest]
#[case("", "https://tokio.rs", vec!["title"])]
#[case("Tokio", "   ", vec!["url"])]
#[case(" ", "", vec!["title", "url"])]
#[tokio::test]
async fn test_missing_fields_block_submit(
    #[case] title: &str,
    #[case] url: &str,
    #[case] expected: Vec<&str>,
) {
    let store = RecordingStore::default();
    let mut form = filled(title, url);

    let err = form.submit(&store).await.unwrap_err();
    let expected: Vec<String> = expected.into_iter().map(str::to_string).collect();
    assert_eq!(err, FormError::Required(expected.clone()));
    assert_eq!(form.missing(), expected.as_slice());
    assert_eq!(store.calls.get(), 0);
}

#[tokio::test]
async fn test_insert_failure_keeps_input_and_shows_error() {
    let store = RecordingStore::default();
    *store.fail_with.borrow_mut() = Some(StoreError::Rejected("unknown owner: u1".to_string()));
    let mut form = filled("Tokio", "https://tokio.rs");

    let err = form.submit(&store).await.unwrap_err();
    assert_eq!(
        err,
        FormError::InsertFailed("Bookmark rejected: unknown owner: u1".to_string())
    );
    assert_eq!(form.title(), "Tokio");
    assert_eq!(form.url(), "https://tokio.rs");
    assert_eq!(form.error(), Some("Bookmark rejected: unknown owner: u1"));
    assert!(!form.is_saving());

    let model = form.render();
    assert_eq!(model.error.as_deref(), Some("Bookmark rejected: unknown owner: u1"));
    assert!(model.missing.is_empty());
}

/// A later successful submit clears the earlier error.
#[tokio::test]
async fn test_retry_after_failure() {
    let store = RecordingStore::default();
    *store.fail_with.borrow_mut() = Some(StoreError::DatabaseError("busy".to_string()));
    let mut form = filled("Tokio", "https://tokio.rs");
    form.submit(&store).await.unwrap_err();

    *store.fail_with.borrow_mut() = None;
    form.submit(&store).await.unwrap();
    assert!(form.error().is_none());
    assert_eq!(store.calls.get(), 2);
}
