//! Bookmark list for a single owner, kept in step with the store.
//!
//! The list is a cache of the external store: one initial read plus the
//! owner's change feed. All mutation goes through [`reduce`], which is
//! idempotent per event and tolerates any interleaving of the initial read
//! with feed delivery:
//!
//! - insert: prepend unless the id is already listed
//! - update: replace in place if listed, otherwise ignore
//! - delete: remove if listed, otherwise ignore
//!
//! Feed events that arrive before the initial read completes are held back
//! and replayed on top of the read result.

use tracing::{debug, info, warn};
use url::Url;

use crate::services::bookmark_store::BookmarkStoreTrait;
use crate::services::change_feed::{ChangeFeedTrait, Subscription};
use crate::types::bookmark::Bookmark;
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;
use crate::types::view::{ListItemModel, ListModel};

/// One visible row.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub bookmark: Bookmark,
    /// A delete request is in flight; the row's delete control is disabled.
    pub pending_delete: bool,
}

impl ListEntry {
    fn new(bookmark: Bookmark) -> Self {
        Self {
            bookmark,
            pending_delete: false,
        }
    }
}

/// Inputs to [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    /// A (re)read was issued; feed events are held until it returns.
    LoadStarted,
    /// The read returned. Errors carry the store's message and leave the
    /// previous rows in place.
    Loaded(Result<Vec<Bookmark>, String>),
    Change(ChangeEvent),
    DeleteStarted(String),
    DeleteFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    entries: Vec<ListEntry>,
    loading: bool,
    backlog: Vec<ChangeEvent>,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            loading: true,
            backlog: Vec::new(),
        }
    }
}

impl ListState {
    /// A state waiting for its initial read.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Listed bookmark ids, in display order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.bookmark.id.as_str()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ListEntry> {
        self.entries.iter().find(|e| e.bookmark.id == id)
    }
}

/// Applies one feed event to a list of entries.
pub fn apply_change(entries: &mut Vec<ListEntry>, event: ChangeEvent) {
    match event {
        ChangeEvent::Insert(bookmark) => {
            if entries.iter().any(|e| e.bookmark.id == bookmark.id) {
                debug!(id = %bookmark.id, "duplicate insert ignored");
            } else {
                entries.insert(0, ListEntry::new(bookmark));
            }
        }
        ChangeEvent::Update(bookmark) => {
            match entries.iter_mut().find(|e| e.bookmark.id == bookmark.id) {
                Some(entry) => entry.bookmark = bookmark,
                None => debug!(id = %bookmark.id, "update for unlisted row ignored"),
            }
        }
        ChangeEvent::Delete { id } => entries.retain(|e| e.bookmark.id != id),
    }
}

/// Maps the current state and one action to the next state.
pub fn reduce(mut state: ListState, action: ListAction) -> ListState {
    match action {
        ListAction::LoadStarted => {
            state.loading = true;
        }
        ListAction::Loaded(result) => {
            let previous = std::mem::take(&mut state.entries);
            state.entries = match result {
                Ok(rows) => rows
                    .into_iter()
                    .map(|bookmark| {
                        let pending_delete = previous
                            .iter()
                            .any(|e| e.pending_delete && e.bookmark.id == bookmark.id);
                        ListEntry {
                            bookmark,
                            pending_delete,
                        }
                    })
                    .collect(),
                // A failed read keeps whatever was shown before (nothing, on mount).
                Err(_) => previous,
            };
            for event in std::mem::take(&mut state.backlog) {
                apply_change(&mut state.entries, event);
            }
            state.loading = false;
        }
        ListAction::Change(event) => {
            if state.loading {
                state.backlog.push(event);
            } else {
                apply_change(&mut state.entries, event);
            }
        }
        ListAction::DeleteStarted(id) => {
            if let Some(entry) = state.entries.iter_mut().find(|e| e.bookmark.id == id) {
                entry.pending_delete = true;
            }
        }
        ListAction::DeleteFailed(id) => {
            if let Some(entry) = state.entries.iter_mut().find(|e| e.bookmark.id == id) {
                entry.pending_delete = false;
            }
        }
    }
    state
}

/// Favicon service URL for a bookmark target, if the URL has a host.
pub fn favicon_url(target: &str) -> Option<String> {
    let parsed = Url::parse(target).ok()?;
    let host = parsed.host_str()?;
    Some(format!("https://www.google.com/s2/favicons?domain={}&sz=32", host))
}

/// The mounted list component for one owner.
///
/// Holds the feed subscription for as long as it is mounted. Dropping or
/// unmounting the component releases it.
#[derive(Debug)]
pub struct BookmarkList {
    owner_id: String,
    state: ListState,
    subscription: Option<Subscription>,
}

impl BookmarkList {
    /// Opens the owner's feed subscription and performs the initial read.
    ///
    /// Feed events that arrive while the read is outstanding are applied as
    /// they come in. A failed subscribe leaves the list static; a failed read
    /// leaves it empty. Neither is reported to the caller.
    pub async fn mount<S, F>(store: &S, feed: &F, owner_id: &str) -> Self
    where
        S: BookmarkStoreTrait,
        F: ChangeFeedTrait,
    {
        let mut list = Self {
            owner_id: owner_id.to_string(),
            state: ListState::new(),
            subscription: None,
        };
        list.open(store, feed).await;
        list
    }

    async fn open<S, F>(&mut self, store: &S, feed: &F)
    where
        S: BookmarkStoreTrait,
        F: ChangeFeedTrait,
    {
        self.state = ListState::new();
        self.subscription = match feed.subscribe(&self.owner_id) {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!(owner_id = %self.owner_id, error = %e, "live updates unavailable");
                None
            }
        };
        self.load(store).await;
        info!(
            owner_id = %self.owner_id,
            count = self.state.entries.len(),
            live = self.subscription.is_some(),
            "bookmark list mounted"
        );
    }

    /// Runs one read while continuing to take feed events.
    async fn load<S: BookmarkStoreTrait>(&mut self, store: &S) {
        self.dispatch(ListAction::LoadStarted);

        let owner_id = self.owner_id.clone();
        let read = store.list_for_owner(&owner_id);
        tokio::pin!(read);

        loop {
            let step = {
                let subscription = &mut self.subscription;
                tokio::select! {
                    biased;
                    result = &mut read => LoadStep::Read(result),
                    Some(event) = next_event(subscription) => LoadStep::Event(event),
                }
            };
            match step {
                LoadStep::Read(result) => {
                    let result = result.map_err(|e| {
                        warn!(owner_id = %owner_id, error = %e, "bookmark read failed");
                        e.to_string()
                    });
                    self.dispatch(ListAction::Loaded(result));
                    break;
                }
                LoadStep::Event(event) => self.dispatch(ListAction::Change(event)),
            }
        }

        self.pump();
    }

    fn dispatch(&mut self, action: ListAction) {
        self.state = reduce(std::mem::take(&mut self.state), action);
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn entries(&self) -> &[ListEntry] {
        self.state.entries()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Whether a feed subscription is open.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Applies every feed event already delivered. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_next) {
            self.dispatch(ListAction::Change(event));
            applied += 1;
        }
        applied
    }

    /// Waits for one feed event and applies it.
    ///
    /// Returns `false` when there is no open subscription or its source closed.
    pub async fn next_change(&mut self) -> bool {
        let event = match self.subscription.as_mut() {
            Some(sub) => sub.next().await,
            None => None,
        };
        match event {
            Some(event) => {
                self.dispatch(ListAction::Change(event));
                true
            }
            None => false,
        }
    }

    /// Re-reads the owner's bookmarks, keeping the subscription.
    pub async fn refresh<S: BookmarkStoreTrait>(&mut self, store: &S) {
        self.load(store).await;
    }

    /// Switches to another owner.
    ///
    /// The current subscription is released before the new one is opened, so
    /// nothing from the previous owner can reach this list afterwards.
    pub async fn change_owner<S, F>(&mut self, store: &S, feed: &F, owner_id: &str)
    where
        S: BookmarkStoreTrait,
        F: ChangeFeedTrait,
    {
        if self.owner_id == owner_id {
            return;
        }
        self.release();
        self.owner_id = owner_id.to_string();
        self.open(store, feed).await;
    }

    /// Tears the component down, releasing its subscription.
    pub fn unmount(mut self) {
        self.release();
        info!(owner_id = %self.owner_id, "bookmark list unmounted");
    }

    fn release(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    /// Marks `id` as being deleted. Returns `false` if it is not listed or
    /// already pending.
    pub fn begin_delete(&mut self, id: &str) -> bool {
        match self.state.get(id) {
            Some(entry) if !entry.pending_delete => {
                self.dispatch(ListAction::DeleteStarted(id.to_string()));
                true
            }
            _ => false,
        }
    }

    /// Records the outcome of a delete request.
    ///
    /// Success leaves the row in place (still disabled); the feed's delete
    /// event removes it. Failure re-enables the row and is only logged.
    pub fn finish_delete(&mut self, id: &str, result: &Result<(), StoreError>) {
        match result {
            Ok(()) => debug!(id, "delete accepted, awaiting feed"),
            Err(e) => {
                warn!(id, error = %e, "failed to delete bookmark");
                self.dispatch(ListAction::DeleteFailed(id.to_string()));
            }
        }
    }

    /// Issues a delete for a listed bookmark.
    ///
    /// A row that is already pending is left alone. Errors are returned for
    /// the caller's logs; the list itself only re-enables the row.
    pub async fn request_delete<S: BookmarkStoreTrait>(
        &mut self,
        store: &S,
        id: &str,
    ) -> Result<(), StoreError> {
        if !self.begin_delete(id) {
            return match self.state.get(id) {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound(id.to_string())),
            };
        }
        let result = store.delete(id).await;
        self.finish_delete(id, &result);
        result
    }

    pub fn render(&self) -> ListModel {
        let items: Vec<ListItemModel> = self
            .entries()
            .iter()
            .map(|entry| ListItemModel {
                id: entry.bookmark.id.clone(),
                title: entry.bookmark.title.clone(),
                url: entry.bookmark.url.clone(),
                created_at: entry.bookmark.created_at,
                favicon_url: favicon_url(&entry.bookmark.url),
                delete_disabled: entry.pending_delete,
            })
            .collect();

        ListModel {
            loading: self.is_loading(),
            live: self.is_live(),
            count: items.len(),
            items,
        }
    }
}

enum LoadStep {
    Read(Result<Vec<Bookmark>, StoreError>),
    Event(ChangeEvent),
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}
