// Smart Bookmark view components
// Components hold UI state: the synchronized bookmark list, the creation form, the session nav.

pub mod bookmark_form;
pub mod bookmark_list;
pub mod session_nav;
