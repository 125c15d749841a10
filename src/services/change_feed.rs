//! Change-feed collaborator.
//!
//! A subscription is scoped to one owner and receives every insert, update
//! and delete made to that owner's bookmarks after it was opened. Releasing a
//! subscription (explicitly or by dropping it) happens exactly once and stops
//! delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::types::change::ChangeEvent;
use crate::types::errors::FeedError;

/// Trait defining the change-feed operations the UI relies on.
pub trait ChangeFeedTrait {
    /// Opens a subscription filtered to rows owned by `owner_id`.
    fn subscribe(&self, owner_id: &str) -> Result<Subscription, FeedError>;
}

type Release = Box<dyn FnOnce() + Send>;

/// Handle to an open feed subscription.
pub struct Subscription {
    id: u64,
    owner_id: String,
    receiver: UnboundedReceiver<ChangeEvent>,
    release: Option<Release>,
}

impl Subscription {
    /// Builds a subscription around a receiver and the action that detaches it
    /// from its source. `release` runs at most once.
    pub fn new<F>(
        id: u64,
        owner_id: &str,
        receiver: UnboundedReceiver<ChangeEvent>,
        release: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id,
            owner_id: owner_id.to_string(),
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns the next buffered event without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next event. `None` once the source has gone away.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Releases the subscription now.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            self.receiver.close();
            // Anything already queued belongs to the released subscription.
            while self.receiver.try_recv().is_ok() {}
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

struct Subscriber {
    owner_id: String,
    sender: UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
    closed: bool,
}

/// In-process change feed. Cloning shares the same set of subscribers.
#[derive(Clone, Default)]
pub struct ChangeFeedHub {
    state: Arc<Mutex<HubState>>,
}

impl ChangeFeedHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Delivers `event` to every open subscription for `owner_id`.
    ///
    /// Returns the number of subscriptions that received it. Subscriptions whose
    /// receiver is gone are pruned.
    pub fn publish(&self, owner_id: &str, event: ChangeEvent) -> usize {
        let mut state = self.lock();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, sub) in state.subscribers.iter() {
            if sub.owner_id != owner_id {
                continue;
            }
            if sub.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            state.subscribers.remove(&id);
        }

        debug!(owner_id, row_id = event.row_id(), delivered, "published change");
        delivered
    }

    /// Stops accepting subscriptions and drops every open one.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.subscribers.clear();
        info!("change feed closed");
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

impl ChangeFeedTrait for ChangeFeedHub {
    fn subscribe(&self, owner_id: &str) -> Result<Subscription, FeedError> {
        let mut state = self.lock();
        if state.closed {
            return Err(FeedError::Unavailable("feed is closed".to_string()));
        }

        let id = state.next_id;
        state.next_id += 1;

        let (sender, receiver) = mpsc::unbounded_channel();
        state.subscribers.insert(
            id,
            Subscriber {
                owner_id: owner_id.to_string(),
                sender,
            },
        );
        debug!(owner_id, subscription = id, "subscribed");

        let shared = Arc::clone(&self.state);
        Ok(Subscription::new(id, owner_id, receiver, move || {
            let mut state = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.subscribers.remove(&id);
            debug!(subscription = id, "unsubscribed");
        }))
    }
}
