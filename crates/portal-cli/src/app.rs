//! Application state for the portal CLI.
//!
//! `App` owns the session provider and the navigation history, and plays
//! the part of the router: after each command it follows whatever
//! navigation the core requested and renders the resulting view.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use portal_core::api::ProbeResult;
use portal_core::auth::open_token_store;
use portal_core::models::{ApiStatus, Credentials, NewAccount};
use portal_core::navigation::NavigationKind;
use portal_core::{Config, History, Route, SessionProvider};

use crate::views::{self, ViewContext};

pub struct App {
    pub config: Config,
    provider: SessionProvider,
    history: Arc<History>,
    base_url: String,
}

impl App {
    /// Load configuration, open token storage, and hydrate the session.
    pub async fn new(api_url: Option<String>) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let base_url = api_url.unwrap_or_else(|| config.api_base_url());
        debug!(%base_url, storage = ?config.token_storage, "Config loaded");

        let store = open_token_store(&config).context("Failed to open token storage")?;
        let history = Arc::new(History::new());
        let provider = SessionProvider::start(&base_url, store, history.clone())
            .await
            .context("Failed to create API client")?;
        // Startup may already have redirected (stale token); nothing to follow yet
        history.take();

        Ok(Self {
            config,
            provider,
            history,
            base_url,
        })
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    async fn follow_navigation(&self) -> Option<Route> {
        follow_navigation(&self.history, &self.provider).await
    }

    /// Render a path through the route table guards.
    pub async fn open(&self, path: &str) -> Result<()> {
        let session = self.provider.session();
        let route = Route::resolve(path, self.provider.is_logged_in(), session.is_admin());
        self.show(route, &[]).await;
        Ok(())
    }

    async fn show(&self, route: Route, probes: &[ProbeResult]) {
        let logged_in = self.provider.is_logged_in();
        // Navbar health indicator is only checked for logged-in users; Home always checks
        let api_status = if logged_in || route == Route::Home {
            Some(self.provider.api().health_check().await)
        } else {
            None
        };

        let session = self.provider.session();
        let ctx = ViewContext {
            session: &session,
            logged_in,
            api_status,
            base_url: &self.base_url,
            probes,
        };
        println!("{}", views::render(route, &ctx));
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn status(&self) -> Result<()> {
        let session = self.provider.session();
        let status = self.provider.api().health_check().await;

        println!("API:     {} ({})", status.label(), self.base_url);
        match session.user() {
            Some(user) => println!(
                "Session: signed in as {} <{}> [{}]",
                user.display_name(),
                user.email,
                user.role_label()
            ),
            None => println!("Session: not signed in"),
        }
        if status == ApiStatus::Offline {
            warn!(base_url = %self.base_url, "API is offline");
        }
        Ok(())
    }

    pub async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username {
            Some(u) => u,
            None => self.prompt_username()?,
        };
        if username.is_empty() {
            anyhow::bail!("Username is required");
        }
        let password = rpassword::prompt_password("Password: ")?;

        let credentials = Credentials::new(username.clone(), password);
        let result = self.provider.login(&credentials).await;
        let destination = self.follow_navigation().await;

        match result {
            Ok(()) => {
                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                info!("Login successful");
                if let Some(route) = destination {
                    self.show(route, &[]).await;
                }
                Ok(())
            }
            Err(e) => {
                // Error text is kept on the session for the login view
                self.show(Route::Login, &[]).await;
                Err(anyhow::Error::new(e).context("Login failed"))
            }
        }
    }

    pub async fn register(&self, email: String, full_name: String) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            anyhow::bail!("Passwords do not match");
        }

        let account = NewAccount {
            email,
            password,
            full_name,
        };
        let result = self.provider.register(&account).await;
        let destination = self.follow_navigation().await;

        match result {
            Ok(()) => {
                println!("Account created. Please sign in.\n");
                self.show(destination.unwrap_or(Route::Login), &[]).await;
                Ok(())
            }
            Err(e) => {
                self.show(Route::Register, &[]).await;
                Err(anyhow::Error::new(e).context("Registration failed"))
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.provider.logout();
        let destination = self.follow_navigation().await.unwrap_or(Route::Home);
        self.show(destination, &[]).await;
        Ok(())
    }

    /// The API demo page, optionally calling each GET endpoint.
    pub async fn api_demo(&self, probe: bool) -> Result<()> {
        let mut probes = Vec::new();
        if probe {
            for endpoint in portal_core::api::DEMO_ENDPOINTS {
                probes.push(self.provider.api().probe(endpoint).await);
            }
        }

        // A 401 from a probe logs out; show the page against the reloaded session
        let _ = self.follow_navigation().await;
        self.show(Route::Api, &probes).await;
        Ok(())
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last_user) => print!("Username [{}]: ", last_user),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            Ok(self.config.last_username.clone().unwrap_or_default())
        } else {
            Ok(input.to_string())
        }
    }
}

/// Follow navigations requested since the last command and return where
/// we ended up. A redirect is a reload: the session is rebuilt from
/// storage first, keeping any error for the view.
async fn follow_navigation(history: &History, provider: &SessionProvider) -> Option<Route> {
    let entries = history.take();
    let last = entries.last()?.route;

    if entries.iter().any(|n| n.kind == NavigationKind::Redirect) {
        debug!("Redirect requested, reloading session");
        provider.hydrate().await;
        // Hydration may redirect again (stale token); we are already there
        history.take();
    }
    Some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::auth::{AuthState, MemoryTokenStore, TokenStore};
    use portal_core::navigation::Navigator;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, store: Arc<MemoryTokenStore>, history: Arc<History>) -> SessionProvider {
        SessionProvider::new(&format!("{}/api/v1", server.uri()), store, history)
            .expect("provider should build")
    }

    #[tokio::test]
    async fn test_redirect_rehydrates_and_keeps_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("tok-stale"));
        let history = Arc::new(History::new());
        let provider = provider(&server, store.clone(), history.clone());
        provider.set_error(Some("Incorrect email or password".to_string()));
        history.navigate(Route::Login, NavigationKind::Redirect);

        let destination = follow_navigation(&history, &provider).await;

        assert_eq!(destination, Some(Route::Login));
        let session = provider.session();
        assert_eq!(session.state, AuthState::Anonymous);
        assert_eq!(session.error.as_deref(), Some("Incorrect email or password"));
        assert_eq!(store.get().unwrap(), None);
        assert!(history.entries().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_login_lands_on_login_view() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login/access-token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect email or password"})),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("tok-old"));
        let history = Arc::new(History::new());
        let provider = provider(&server, store.clone(), history.clone());

        let credentials = Credentials::new("a@b.com", "wrong-password");
        provider.login(&credentials).await.unwrap_err();
        let destination = follow_navigation(&history, &provider).await;

        assert_eq!(destination, Some(Route::Login));
        let session = provider.session();
        assert_eq!(session.state, AuthState::Anonymous);
        assert_eq!(session.error.as_deref(), Some("Incorrect email or password"));
        assert!(!provider.is_logged_in());
        // Token was already gone, so the reload made no profile request
        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn test_push_does_not_rehydrate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login/access-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-123",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "1",
                "email": "a@b.com",
                "full_name": "A B",
                "is_active": true,
                "is_superuser": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::new());
        let history = Arc::new(History::new());
        let provider = provider(&server, store, history.clone());

        provider
            .login(&Credentials::new("a@b.com", "pw123456"))
            .await
            .expect("login should succeed");
        let destination = follow_navigation(&history, &provider).await;

        assert_eq!(destination, Some(Route::Dashboard));
        assert!(provider.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_nothing_to_follow() {
        let server = MockServer::start().await;
        let history = Arc::new(History::new());
        let provider = provider(&server, Arc::new(MemoryTokenStore::new()), history.clone());

        assert_eq!(follow_navigation(&history, &provider).await, None);
        assert!(provider.session().is_loading());
    }
}
