//! Render models handed to whatever draws the UI.
//!
//! Components produce these from their state; they carry no behavior.

use serde::Serialize;

/// The page currently shown.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Signed-out landing page with the sign-in call to action.
    Landing { provider: String },
    /// Shown when the provider callback failed.
    AuthError { message: String },
    Dashboard(DashboardModel),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardModel {
    pub nav: NavModel,
    pub form: FormModel,
    pub list: ListModel,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavModel {
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Shown in place of the avatar when there is none.
    pub initial: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormModel {
    pub title: String,
    pub url: String,
    pub saving: bool,
    pub missing: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListModel {
    pub loading: bool,
    /// Whether a change-feed subscription is open.
    pub live: bool,
    pub count: usize,
    pub items: Vec<ListItemModel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListItemModel {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: i64,
    pub favicon_url: Option<String>,
    pub delete_disabled: bool,
}
