use std::fmt;

// === StoreError ===

/// Errors returned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Bookmark with the given ID was not found.
    NotFound(String),
    /// The store refused the row (failed a server-side check).
    Rejected(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            StoreError::Rejected(msg) => write!(f, "Bookmark rejected: {}", msg),
            StoreError::DatabaseError(msg) => write!(f, "Bookmark database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// === FeedError ===

/// Errors related to change-feed subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// The feed is not accepting subscriptions.
    Unavailable(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Unavailable(msg) => write!(f, "Change feed unavailable: {}", msg),
        }
    }
}

impl std::error::Error for FeedError {}

// === IdentityError ===

/// Errors related to the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityError {
    /// The provider callback did not complete a sign-in.
    InvalidCallback(String),
    /// No user is signed in.
    NotAuthenticated,
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::InvalidCallback(msg) => write!(f, "Sign-in failed: {}", msg),
            IdentityError::NotAuthenticated => write!(f, "Not signed in"),
            IdentityError::DatabaseError(msg) => write!(f, "Identity database error: {}", msg),
        }
    }
}

impl std::error::Error for IdentityError {}

// === FormError ===

/// Errors surfaced by the bookmark creation form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// One or more required fields were empty; nothing was submitted.
    Required(Vec<String>),
    /// The insert call failed; carries the store's message.
    InsertFailed(String),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::Required(fields) => {
                write!(f, "Required field missing: {}", fields.join(", "))
            }
            FormError::InsertFailed(msg) => write!(f, "Failed to add bookmark: {}", msg),
        }
    }
}

impl std::error::Error for FormError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
