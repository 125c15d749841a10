//! Identity collaborator.
//!
//! `LocalIdentity` stands in for the external provider: it accepts the
//! provider's sign-in callback, keeps users and the single active session in
//! SQLite, and answers "who is signed in".

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::types::errors::IdentityError;
use crate::types::session::{AuthCallback, Session, User};

/// Trait defining the identity operations the UI relies on.
#[allow(async_fn_in_trait)]
pub trait IdentityProviderTrait {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Result<Option<User>, IdentityError>;
    /// Ends the active session.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Identity provider backed by SQLite.
pub struct LocalIdentity {
    db: Arc<Database>,
}

impl LocalIdentity {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Completes an external sign-in.
    ///
    /// Fails with `InvalidCallback` when the provider reported an error or did
    /// not hand back an authorization code. Otherwise the user is created or
    /// refreshed by email and replaces any existing session.
    pub fn complete_sign_in(&self, callback: &AuthCallback) -> Result<Session, IdentityError> {
        if let Some(err) = &callback.error {
            warn!(error = %err, "provider rejected sign-in");
            return Err(IdentityError::InvalidCallback(err.clone()));
        }
        if callback.code.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(IdentityError::InvalidCallback("missing authorization code".to_string()));
        }
        let email = callback.email.trim();
        if email.is_empty() {
            return Err(IdentityError::InvalidCallback("provider returned no email".to_string()));
        }

        let user = self.upsert_user(email, callback.avatar_url.as_deref())?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user,
            started_at: Self::now(),
        };

        let conn = self.db.connection();
        conn.execute("DELETE FROM sessions", [])
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, started_at) VALUES (?1, ?2, ?3)",
            params![session.id, session.user.id, session.started_at],
        )
        .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// The active session, if any.
    pub fn current_session(&self) -> Result<Option<Session>, IdentityError> {
        self.db
            .connection()
            .query_row(
                "SELECT s.id, s.started_at, u.id, u.email, u.avatar_url \
                 FROM sessions s JOIN users u ON u.id = s.user_id \
                 ORDER BY s.started_at DESC LIMIT 1",
                [],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        user: User {
                            id: row.get(2)?,
                            email: row.get(3)?,
                            avatar_url: row.get(4)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))
    }

    fn upsert_user(&self, email: &str, avatar_url: Option<&str>) -> Result<User, IdentityError> {
        let conn = self.db.connection();
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE users SET avatar_url = ?1 WHERE id = ?2",
                    params![avatar_url, id],
                )
                .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    "INSERT INTO users (id, email, avatar_url, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![id, email, avatar_url, Self::now()],
                )
                .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;
                id
            }
        };

        Ok(User {
            id,
            email: email.to_string(),
            avatar_url: avatar_url.map(str::to_string),
        })
    }
}

impl IdentityProviderTrait for LocalIdentity {
    async fn current_user(&self) -> Result<Option<User>, IdentityError> {
        Ok(self.current_session()?.map(|s| s.user))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.db
            .connection()
            .execute("DELETE FROM sessions", [])
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;
        info!("signed out");
        Ok(())
    }
}
