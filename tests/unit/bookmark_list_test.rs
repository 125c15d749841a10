//! Unit tests for the bookmark list: reducer rules, mount/load interleaving,
//! delete flow and subscription lifecycle.

use std::cell::{Cell, RefCell};

use smart_bookmark::managers::bookmark_list::{reduce, BookmarkList, ListAction, ListState};
use smart_bookmark::services::bookmark_store::BookmarkStoreTrait;
use smart_bookmark::services::change_feed::{ChangeFeedHub, ChangeFeedTrait, Subscription};
use smart_bookmark::types::bookmark::{Bookmark, NewBookmark};
use smart_bookmark::types::change::ChangeEvent;
use smart_bookmark::types::errors::{FeedError, StoreError};

fn bookmark(id: &str) -> Bookmark {
    Bookmark {
        id: id.to_string(),
        title: format!("title {}", id),
        url: format!("https://{}.example.com/", id),
        user_id: "u1".to_string(),
        created_at: 0,
    }
}

/// Store double. Reads return `rows`, optionally publishing `during_read`
/// on the hub first and yielding so the list sees the events mid-read.
#[derive(Default)]
struct FakeStore {
    rows: RefCell<Vec<Bookmark>>,
    hub: ChangeFeedHub,
    during_read: RefCell<Vec<ChangeEvent>>,
    fail_read: Cell<bool>,
    fail_delete: Cell<bool>,
    reads: Cell<usize>,
    deletes: Cell<usize>,
}

impl FakeStore {
    fn with_rows(hub: &ChangeFeedHub, rows: Vec<Bookmark>) -> Self {
        Self {
            rows: RefCell::new(rows),
            hub: hub.clone(),
            ..Default::default()
        }
    }
}

impl BookmarkStoreTrait for FakeStore {
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        self.reads.set(self.reads.get() + 1);
        let snapshot = self.rows.borrow().clone();
        for event in self.during_read.borrow_mut().drain(..) {
            self.hub.publish(owner_id, event);
        }
        tokio::task::yield_now().await;
        if self.fail_read.get() {
            return Err(StoreError::DatabaseError("connection reset".to_string()));
        }
        Ok(snapshot)
    }

    async fn insert(&self, _new: NewBookmark) -> Result<Bookmark, StoreError> {
        Err(StoreError::Rejected("not used".to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.deletes.set(self.deletes.get() + 1);
        if self.fail_delete.get() {
            return Err(StoreError::DatabaseError("permission denied".to_string()));
        }
        self.rows.borrow_mut().retain(|b| b.id != id);
        Ok(())
    }
}

struct DownFeed;

impl ChangeFeedTrait for DownFeed {
    fn subscribe(&self, _owner_id: &str) -> Result<Subscription, FeedError> {
        Err(FeedError::Unavailable("offline".to_string()))
    }
}

fn loaded(rows: Vec<Bookmark>) -> ListState {
    let state = reduce(ListState::new(), ListAction::LoadStarted);
    reduce(state, ListAction::Loaded(Ok(rows)))
}

// === Reducer ===

#[test]
fn test_insert_prepends() {
    let state = loaded(vec![bookmark("a")]);
    let state = reduce(state, ListAction::Change(ChangeEvent::Insert(bookmark("b"))));
    assert_eq!(state.ids(), vec!["b", "a"]);
}

#[test]
fn test_duplicate_insert_is_ignored() {
    let state = loaded(vec![bookmark("a")]);
    let state = reduce(state, ListAction::Change(ChangeEvent::Insert(bookmark("a"))));
    assert_eq!(state.ids(), vec!["a"]);
}

#[test]
fn test_update_replaces_in_place() {
    let state = loaded(vec![bookmark("b"), bookmark("a")]);
    let mut renamed = bookmark("a");
    renamed.title = "renamed".to_string();

    let state = reduce(state, ListAction::Change(ChangeEvent::Update(renamed)));
    assert_eq!(state.ids(), vec!["b", "a"]);
    assert_eq!(state.get("a").unwrap().bookmark.title, "renamed");

    let state = reduce(state, ListAction::Change(ChangeEvent::Update(bookmark("zz"))));
    assert_eq!(state.ids(), vec!["b", "a"]);
}

#[test]
fn test_delete_removes_and_ignores_unknown() {
    let state = loaded(vec![bookmark("b"), bookmark("a")]);
    let state = reduce(state, ListAction::Change(ChangeEvent::Delete { id: "b".to_string() }));
    let state = reduce(state, ListAction::Change(ChangeEvent::Delete { id: "nope".to_string() }));
    assert_eq!(state.ids(), vec!["a"]);
}

#[test]
fn test_events_during_load_apply_after_read() {
    let state = reduce(ListState::new(), ListAction::LoadStarted);
    let state = reduce(state, ListAction::Change(ChangeEvent::Insert(bookmark("b"))));
    let state = reduce(state, ListAction::Change(ChangeEvent::Delete { id: "a".to_string() }));
    assert!(state.is_loading());
    assert!(state.entries().is_empty());

    let state = reduce(state, ListAction::Loaded(Ok(vec![bookmark("a"), bookmark("c")])));
    assert!(!state.is_loading());
    assert_eq!(state.ids(), vec!["b", "c"]);
}

#[test]
fn test_failed_read_keeps_previous_rows() {
    let state = loaded(vec![bookmark("a")]);
    let state = reduce(state, ListAction::LoadStarted);
    let state = reduce(state, ListAction::Loaded(Err("timeout".to_string())));
    assert_eq!(state.ids(), vec!["a"]);
    assert!(!state.is_loading());
}

#[test]
fn test_pending_mark_survives_reload() {
    let state = loaded(vec![bookmark("a"), bookmark("b")]);
    let state = reduce(state, ListAction::DeleteStarted("a".to_string()));
    let state = reduce(state, ListAction::LoadStarted);
    let state = reduce(state, ListAction::Loaded(Ok(vec![bookmark("a"), bookmark("b")])));

    assert!(state.get("a").unwrap().pending_delete);
    assert!(!state.get("b").unwrap().pending_delete);
}

// === Mounted component ===

#[tokio::test]
async fn test_mount_reads_and_subscribes() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);

    let mut list = BookmarkList::mount(&store, &hub, "u1").await;
    assert_eq!(list.state().ids(), vec!["a"]);
    assert!(!list.is_loading());
    assert!(list.is_live());
    assert_eq!(hub.subscriber_count(), 1);

    hub.publish("u1", ChangeEvent::Insert(bookmark("b")));
    assert_eq!(list.pump(), 1);
    assert_eq!(list.state().ids(), vec!["b", "a"]);
}

/// An insert delivered while the read is in flight shows up exactly once,
/// whether or not the read already contains it.
#[tokio::test]
async fn test_insert_racing_initial_read() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    store
        .during_read
        .borrow_mut()
        .push(ChangeEvent::Insert(bookmark("b")));

    let list = BookmarkList::mount(&store, &hub, "u1").await;
    assert_eq!(list.state().ids(), vec!["b", "a"]);

    let store = FakeStore::with_rows(&hub, vec![bookmark("b"), bookmark("a")]);
    store
        .during_read
        .borrow_mut()
        .push(ChangeEvent::Insert(bookmark("b")));
    let list = BookmarkList::mount(&store, &hub, "u2").await;
    assert_eq!(list.state().ids(), vec!["b", "a"]);
}

#[tokio::test]
async fn test_delete_racing_initial_read() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("b"), bookmark("a")]);
    store
        .during_read
        .borrow_mut()
        .push(ChangeEvent::Delete { id: "b".to_string() });

    let list = BookmarkList::mount(&store, &hub, "u1").await;
    assert_eq!(list.state().ids(), vec!["a"]);
}

#[tokio::test]
async fn test_failed_read_on_mount_is_empty() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    store.fail_read.set(true);

    let mut list = BookmarkList::mount(&store, &hub, "u1").await;
    assert!(list.entries().is_empty());
    assert!(!list.is_loading());

    // Still live: later events are applied.
    hub.publish("u1", ChangeEvent::Insert(bookmark("c")));
    list.pump();
    assert_eq!(list.state().ids(), vec!["c"]);
}

#[tokio::test]
async fn test_unavailable_feed_leaves_static_list() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);

    let mut list = BookmarkList::mount(&store, &DownFeed, "u1").await;
    assert_eq!(list.state().ids(), vec!["a"]);
    assert!(!list.is_live());
    assert_eq!(list.pump(), 0);
    assert!(!list.next_change().await);
}

#[tokio::test]
async fn test_next_change_applies_one_event() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![]);
    let mut list = BookmarkList::mount(&store, &hub, "u1").await;

    hub.publish("u1", ChangeEvent::Insert(bookmark("a")));
    assert!(list.next_change().await);
    assert_eq!(list.state().ids(), vec!["a"]);
}

#[tokio::test]
async fn test_refresh_rereads() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    let mut list = BookmarkList::mount(&store, &hub, "u1").await;

    store.rows.borrow_mut().insert(0, bookmark("z"));
    list.refresh(&store).await;
    assert_eq!(list.state().ids(), vec!["z", "a"]);
    assert_eq!(store.reads.get(), 2);
    assert_eq!(hub.subscriber_count(), 1);
}

// === Delete flow ===

#[tokio::test]
async fn test_successful_delete_waits_for_feed() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    let mut list = BookmarkList::mount(&store, &hub, "u1").await;

    list.request_delete(&store, "a").await.unwrap();
    assert_eq!(store.deletes.get(), 1);
    assert!(list.state().get("a").unwrap().pending_delete);
    assert!(list.render().items[0].delete_disabled);

    hub.publish("u1", ChangeEvent::Delete { id: "a".to_string() });
    list.pump();
    assert!(list.entries().is_empty());
}

#[tokio::test]
async fn test_failed_delete_reenables_row() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    store.fail_delete.set(true);
    let mut list = BookmarkList::mount(&store, &hub, "u1").await;

    let err = list.request_delete(&store, "a").await.unwrap_err();
    assert!(matches!(err, StoreError::DatabaseError(_)));

    let entry = list.state().get("a").unwrap();
    assert!(!entry.pending_delete);
    assert_eq!(list.state().ids(), vec!["a"]);
}

#[tokio::test]
async fn test_pending_delete_is_not_resent() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    let mut list = BookmarkList::mount(&store, &hub, "u1").await;

    assert!(list.begin_delete("a"));
    assert!(!list.begin_delete("a"));
    list.request_delete(&store, "a").await.unwrap();
    assert_eq!(store.deletes.get(), 0);

    let err = list.request_delete(&store, "ghost").await.unwrap_err();
    assert_eq!(err, StoreError::NotFound("ghost".to_string()));
}

// === Lifecycle ===

#[tokio::test]
async fn test_unmount_releases_subscription() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![]);
    let list = BookmarkList::mount(&store, &hub, "u1").await;
    assert_eq!(hub.subscriber_count(), 1);

    list.unmount();
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_drop_releases_subscription() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![]);
    {
        let _list = BookmarkList::mount(&store, &hub, "u1").await;
        assert_eq!(hub.subscriber_count(), 1);
    }
    assert_eq!(hub.subscriber_count(), 0);
}

/// After switching owners, events queued for the old owner never reach the list.
#[tokio::test]
async fn test_change_owner_drops_old_events() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    let mut list = BookmarkList::mount(&store, &hub, "u1").await;

    hub.publish("u1", ChangeEvent::Insert(bookmark("stale")));
    *store.rows.borrow_mut() = vec![bookmark("mine")];
    list.change_owner(&store, &hub, "u2").await;

    assert_eq!(list.owner_id(), "u2");
    assert_eq!(hub.subscriber_count(), 1);
    assert_eq!(list.state().ids(), vec!["mine"]);

    hub.publish("u1", ChangeEvent::Insert(bookmark("late")));
    assert_eq!(list.pump(), 0);
    assert_eq!(list.state().ids(), vec!["mine"]);
}

#[tokio::test]
async fn test_render_model() {
    let hub = ChangeFeedHub::new();
    let store = FakeStore::with_rows(&hub, vec![bookmark("a")]);
    let list = BookmarkList::mount(&store, &hub, "u1").await;

    let model = list.render();
    assert!(!model.loading);
    assert!(model.live);
    assert_eq!(model.count, 1);
    assert_eq!(model.items[0].title, "title a");
    assert_eq!(
        model.items[0].favicon_url.as_deref(),
        Some("https://www.google.com/s2/favicons?domain=a.example.com&sz=32")
    );
    assert!(!model.items[0].delete_disabled);
}
