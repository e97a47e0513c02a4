//! Session provider: the single source of truth for who is logged in.
//!
//! State machine:
//!
//! ```text
//! Hydrating ──► Authenticated(profile) ◄─┐
//!     │               │ logout          │ login
//!     └────────► Anonymous ─────────────┘
//! ```
//!
//! The provider is an owned value passed to whatever renders views; there
//! is no global session. Observers subscribe to a `watch` channel and see
//! every transition.
//!
//! The provider builds its own `ApiClient` so the 401 middleware writes to
//! the same channel: any unauthorized response ends the session at once.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiClientBuilder, ApiError, BearerAuth, LogoutOnUnauthorized};
use crate::models::{Credentials, NewAccount, UserProfile};
use crate::navigation::{NavigationKind, Navigator, Route};

use super::store::{StoreError, TokenStore};

/// Shown when a failed login carries no `detail` from the server
const LOGIN_FAILED: &str = "Login failed";

/// Shown when a failed registration carries no `detail` from the server
const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Error, Debug)]
pub enum AuthError {
    /// The API refused or could not be reached. `message` is displayable.
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("Could not save access token: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    fn rejected(source: ApiError, fallback: &str) -> Self {
        let message = source.detail().unwrap_or_else(|| fallback.to_string());
        AuthError::Rejected { message, source }
    }

    /// The underlying API error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AuthError::Rejected { source, .. } => Some(source),
            AuthError::Storage(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Startup check against the stored token has not finished
    Hydrating,
    Authenticated(UserProfile),
    Anonymous,
}

/// Snapshot of the session as seen by views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: AuthState,
    /// Last login/registration failure, for display
    pub error: Option<String>,
}

impl Session {
    fn hydrating() -> Self {
        Self {
            state: AuthState::Hydrating,
            error: None,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Hydrating
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn is_admin(&self) -> bool {
        self.user().map(|u| u.is_superuser).unwrap_or(false)
    }
}

pub struct SessionProvider {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<Session>>,
}

impl SessionProvider {
    /// Create a provider in the `Hydrating` state with a client for
    /// `base_url`. Call `hydrate` before relying on the session.
    pub fn new(
        base_url: &str,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Self::from_builder(ApiClient::builder(base_url), store, navigator)
    }

    /// Like `new`, but keeps whatever headers and timeout `builder` carries.
    /// The session middleware is appended after any already registered.
    pub fn from_builder(
        builder: ApiClientBuilder,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let (state, _) = watch::channel(Session::hydrating());
        let state = Arc::new(state);

        let api = builder
            .request_middleware(BearerAuth::new(store.clone()))
            .response_middleware(
                LogoutOnUnauthorized::new(store.clone(), navigator.clone()).with_session(state.clone()),
            )
            .build()?;

        Ok(Self {
            api,
            store,
            navigator,
            state,
        })
    }

    /// Create a provider and run the startup hydration.
    pub async fn start(
        base_url: &str,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let provider = Self::new(base_url, store, navigator)?;
        provider.hydrate().await;
        Ok(provider)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receive every session change from now on.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Whether a token is stored. This, not the in-memory profile, is what
    /// decides "possibly logged in".
    pub fn is_logged_in(&self) -> bool {
        match self.store.get() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                false
            }
        }
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    /// Rebuild the session from the stored token.
    ///
    /// Any failure leaves the session anonymous with the token removed and
    /// no error shown.
    pub async fn hydrate(&self) {
        self.set_state(AuthState::Hydrating);

        let token = match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read access token, starting anonymous");
                None
            }
        };

        if token.is_none() {
            debug!("No stored token");
            self.set_state(AuthState::Anonymous);
            return;
        }

        match self.api.current_user().await {
            Ok(user) => {
                debug!(user_id = %user.id, "Session restored");
                self.set_state(AuthState::Authenticated(user));
            }
            Err(e) => {
                debug!(error = %e, "Stored token rejected, clearing");
                self.forget_token();
                self.set_state(AuthState::Anonymous);
            }
        }
    }

    // =========================================================================
    // Login / Register / Logout
    // =========================================================================

    /// Exchange credentials for a token, load the profile, and navigate to
    /// the admin or standard dashboard.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.clear_error();

        let user = match self.try_login(credentials).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.set_error(Some(e.to_string()));
                return Err(e);
            }
        };

        info!(user_id = %user.id, admin = user.is_superuser, "Login successful");
        let destination = if user.is_superuser {
            Route::Admin
        } else {
            Route::Dashboard
        };
        self.set_state(AuthState::Authenticated(user));
        self.navigator.navigate(destination, NavigationKind::Push);
        Ok(())
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        let token = self
            .api
            .login_access_token(credentials)
            .await
            .map_err(|e| AuthError::rejected(e, LOGIN_FAILED))?;

        self.store.set(&token.access_token)?;

        self.api
            .current_user()
            .await
            .map_err(|e| AuthError::rejected(e, LOGIN_FAILED))
    }

    /// Create an account and send the user to the login view. Does not
    /// log in.
    pub async fn register(&self, account: &NewAccount) -> Result<(), AuthError> {
        self.clear_error();

        match self.api.register(account).await {
            Ok(user) => {
                info!(user_id = %user.id, "Registration successful");
                self.navigator.navigate(Route::Login, NavigationKind::Push);
                Ok(())
            }
            Err(e) => {
                let err = AuthError::rejected(e, REGISTRATION_FAILED);
                warn!(error = %err, "Registration failed");
                self.set_error(Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Forget the token and go home. No network call.
    pub fn logout(&self) {
        self.forget_token();
        self.set_state(AuthState::Anonymous);
        info!("Logged out");
        self.navigator.navigate(Route::Home, NavigationKind::Push);
    }

    // =========================================================================
    // Error state
    // =========================================================================

    pub fn set_error(&self, message: Option<String>) {
        self.state.send_modify(|session| session.error = message);
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_modify(|session| session.state = state);
    }

    fn forget_token(&self) {
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove access token");
        }
    }
}
