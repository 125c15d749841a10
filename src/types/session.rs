use serde::{Deserialize, Serialize};

/// An authenticated identity, as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// The active sign-in session for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user: User,
    pub started_at: i64,
}

/// What the identity provider hands back after the external sign-in redirect.
///
/// A callback carrying `error`, or lacking `code`, is a failed sign-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthCallback {
    pub code: Option<String>,
    pub error: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
}
