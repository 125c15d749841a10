//! Header navigation for a signed-in user.

use tracing::info;

use crate::services::identity::IdentityProviderTrait;
use crate::types::errors::IdentityError;
use crate::types::session::User;
use crate::types::view::NavModel;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionNav {
    user: User,
}

impl SessionNav {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// The local part of the email address.
    pub fn display_name(&self) -> &str {
        self.user
            .email
            .split('@')
            .next()
            .unwrap_or(&self.user.email)
    }

    /// Uppercased first character of the email, shown when there is no avatar.
    pub fn initial(&self) -> String {
        self.user
            .email
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// Ends the session with the identity provider.
    ///
    /// The caller re-evaluates the view afterwards.
    pub async fn sign_out<I: IdentityProviderTrait>(
        &self,
        identity: &I,
    ) -> Result<(), IdentityError> {
        info!(user_id = %self.user.id, "sign-out requested");
        identity.sign_out().await
    }

    pub fn render(&self) -> NavModel {
        NavModel {
            email: self.user.email.clone(),
            display_name: self.display_name().to_string(),
            avatar_url: self.user.avatar_url.clone(),
            initial: self.initial(),
        }
    }
}
