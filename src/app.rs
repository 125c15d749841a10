//! App Core for Smart Bookmark.
//!
//! Owns the platform collaborators and decides which view is shown: the
//! landing page when nobody is signed in, the dashboard (nav, form, list)
//! when someone is, and the auth-error page after a failed sign-in.

use std::fs;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::database::connection::Database;
use crate::managers::bookmark_form::BookmarkForm;
use crate::managers::bookmark_list::BookmarkList;
use crate::managers::session_nav::SessionNav;
use crate::services::bookmark_store::LocalBookmarkStore;
use crate::services::change_feed::ChangeFeedHub;
use crate::services::identity::{IdentityProviderTrait, LocalIdentity};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::bookmark::Bookmark;
use crate::types::errors::{FormError, IdentityError, StoreError};
use crate::types::session::{AuthCallback, User};
use crate::types::view::{DashboardModel, View};

/// Text shown on the auth-error page.
pub const AUTH_ERROR_MESSAGE: &str = "Something went wrong during sign in. Please try again.";

/// Addressable pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    AuthCodeError,
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Home),
            "/auth/auth-code-error" => Some(Route::AuthCodeError),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::AuthCodeError => "/auth/auth-code-error",
        }
    }
}

/// Components mounted while a user is signed in.
#[derive(Debug)]
pub struct Dashboard {
    pub nav: SessionNav,
    pub form: BookmarkForm,
    pub list: BookmarkList,
}

/// Central application struct holding settings, collaborators and view state.
pub struct App {
    pub db: Arc<Database>,
    pub settings_engine: SettingsEngine,
    pub identity: LocalIdentity,
    pub store: LocalBookmarkStore,
    pub feed: ChangeFeedHub,
    route: Route,
    dashboard: Option<Dashboard>,
}

impl App {
    /// Opens the database named by the settings and wires the collaborators.
    pub fn new(settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = settings_engine.database_path();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = Database::open(&db_path)?;
        info!(path = %db_path.display(), "database opened");
        Ok(Self::with_database(Arc::new(db), settings_engine))
    }

    /// Same as [`App::new`] but on a throwaway in-memory database.
    pub fn open_in_memory(
        settings_engine: SettingsEngine,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(Arc::new(db), settings_engine))
    }

    fn with_database(db: Arc<Database>, settings_engine: SettingsEngine) -> Self {
        let feed = ChangeFeedHub::new();
        Self {
            identity: LocalIdentity::new(db.clone()),
            store: LocalBookmarkStore::new(db.clone(), feed.clone()),
            feed,
            db,
            settings_engine,
            route: Route::Home,
            dashboard: None,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn navigate(&mut self, route: Route) {
        self.route = route;
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    /// Re-evaluates the view from the identity provider.
    ///
    /// Signed out: the dashboard is torn down. Signed in: the dashboard is
    /// mounted for that user, or moved over if a different user is now
    /// signed in. An identity lookup failure counts as signed out.
    pub async fn refresh(&mut self) {
        let user = match self.identity.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "identity check failed");
                None
            }
        };

        let Some(user) = user else {
            if let Some(dashboard) = self.dashboard.take() {
                dashboard.list.unmount();
            }
            return;
        };

        match self.dashboard.as_mut() {
            Some(dashboard) => {
                if dashboard.nav.user().id != user.id {
                    dashboard
                        .list
                        .change_owner(&self.store, &self.feed, &user.id)
                        .await;
                    dashboard.form = BookmarkForm::new(&user.id);
                }
                dashboard.nav = SessionNav::new(user);
            }
            None => {
                let dashboard = self.mount_dashboard(user).await;
                self.dashboard = Some(dashboard);
            }
        }
    }

    async fn mount_dashboard(&self, user: User) -> Dashboard {
        let list = BookmarkList::mount(&self.store, &self.feed, &user.id).await;
        Dashboard {
            form: BookmarkForm::new(&user.id),
            nav: SessionNav::new(user),
            list,
        }
    }

    /// Handles the identity provider's sign-in callback.
    ///
    /// A failed callback routes to the auth-error page.
    pub async fn complete_sign_in(
        &mut self,
        callback: &AuthCallback,
    ) -> Result<User, IdentityError> {
        match self.identity.complete_sign_in(callback) {
            Ok(session) => {
                self.route = Route::Home;
                self.refresh().await;
                Ok(session.user)
            }
            Err(e) => {
                warn!(error = %e, "sign-in callback failed");
                self.route = Route::AuthCodeError;
                Err(e)
            }
        }
    }

    /// Ends the session and falls back to the landing page.
    pub async fn sign_out(&mut self) -> Result<(), IdentityError> {
        let result = match &self.dashboard {
            Some(dashboard) => dashboard.nav.sign_out(&self.identity).await,
            None => self.identity.sign_out().await,
        };
        self.refresh().await;
        result
    }

    /// Fills and submits the dashboard form.
    pub async fn submit_bookmark(&mut self, title: &str, url: &str) -> Result<Bookmark, FormError> {
        let dashboard = self
            .dashboard
            .as_mut()
            .ok_or_else(|| FormError::InsertFailed(IdentityError::NotAuthenticated.to_string()))?;
        dashboard.form.set_title(title);
        dashboard.form.set_url(url);
        dashboard.form.submit(&self.store).await
    }

    /// Requests deletion of a listed bookmark.
    ///
    /// Errors only for a request that names no listed row (or has no
    /// session). A failed store call is logged by the list, which re-enables
    /// the row; the caller still gets `Ok`.
    pub async fn delete_bookmark(&mut self, id: &str) -> Result<(), StoreError> {
        let dashboard = self
            .dashboard
            .as_mut()
            .ok_or_else(|| StoreError::Rejected(IdentityError::NotAuthenticated.to_string()))?;
        if dashboard.list.state().get(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if let Err(e) = dashboard.list.request_delete(&self.store, id).await {
            debug!(id, error = %e, "delete not applied");
        }
        Ok(())
    }

    /// Applies delivered feed events to the mounted list.
    pub fn poll_feed(&mut self) -> usize {
        self.dashboard
            .as_mut()
            .map_or(0, |dashboard| dashboard.list.pump())
    }

    /// Produces the current view, after applying any delivered feed events.
    pub fn render(&mut self) -> View {
        self.poll_feed();

        if self.route == Route::AuthCodeError {
            return View::AuthError {
                message: AUTH_ERROR_MESSAGE.to_string(),
            };
        }

        match &self.dashboard {
            Some(dashboard) => View::Dashboard(DashboardModel {
                nav: dashboard.nav.render(),
                form: dashboard.form.render(),
                list: dashboard.list.render(),
            }),
            None => View::Landing {
                provider: self.settings_engine.get_settings().auth.provider.clone(),
            },
        }
    }

    /// Shutdown sequence: release the subscription and close the feed.
    pub fn shutdown(&mut self) {
        if let Some(dashboard) = self.dashboard.take() {
            dashboard.list.unmount();
        }
        self.feed.close();
    }
}
