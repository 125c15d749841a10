// Smart Bookmark services
// Collaborators (identity, bookmark store, change feed) and the settings engine.

pub mod bookmark_store;
pub mod change_feed;
pub mod identity;
pub mod settings_engine;
