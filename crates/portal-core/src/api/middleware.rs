//! Request and response middleware for `ApiClient`.
//!
//! Middleware is registered on the client builder and runs in registration
//! order for every request the client sends. There is no per-call opt-out.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, StatusCode};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::{AuthState, Session, TokenStore};
use crate::navigation::{NavigationKind, Navigator, Route};

use super::ApiError;

/// Transforms an outbound request before it is sent.
pub trait RequestMiddleware: Send + Sync {
    fn on_request(&self, request: &mut Request) -> Result<(), ApiError>;
}

/// Observes every inbound response, successful or not, before the client
/// turns it into a result.
pub trait ResponseMiddleware: Send + Sync {
    fn on_response(&self, response: &Response);
}

/// Attaches `Authorization: Bearer <token>` when a token is persisted.
pub struct BearerAuth {
    store: Arc<dyn TokenStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

impl RequestMiddleware for BearerAuth {
    fn on_request(&self, request: &mut Request) -> Result<(), ApiError> {
        let token = match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read access token, sending request without it");
                None
            }
        };

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidToken)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(())
    }
}

/// On a 401, forgets the persisted token and forces a redirect to login.
/// When given the session channel it also marks the session anonymous.
pub struct LogoutOnUnauthorized {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    session: Option<Arc<watch::Sender<Session>>>,
}

impl LogoutOnUnauthorized {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            navigator,
            session: None,
        }
    }

    /// Also drop the in-memory session on a 401.
    pub fn with_session(mut self, session: Arc<watch::Sender<Session>>) -> Self {
        self.session = Some(session);
        self
    }
}

impl ResponseMiddleware for LogoutOnUnauthorized {
    fn on_response(&self, response: &Response) {
        if response.status() != StatusCode::UNAUTHORIZED {
            return;
        }

        info!(url = %response.url().path(), "Unauthorized response, clearing session");
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove access token");
        }
        if let Some(session) = &self.session {
            session.send_if_modified(|s| {
                if s.state == AuthState::Anonymous {
                    return false;
                }
                s.state = AuthState::Anonymous;
                true
            });
        }
        self.navigator.navigate(Route::Login, NavigationKind::Redirect);
        debug!("Redirected to login");
    }
}
