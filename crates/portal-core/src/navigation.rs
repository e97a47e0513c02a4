//! Routes, the navigation seam, and the route table guards.
//!
//! The session provider and the 401 middleware never render anything;
//! they only ask a `Navigator` to move somewhere. Front ends decide what
//! moving means.

use std::sync::Mutex;

use tracing::debug;

/// Views of the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    About,
    Api,
    Contact,
    Login,
    Register,
    Dashboard,
    Admin,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Home,
        Route::About,
        Route::Api,
        Route::Contact,
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Admin,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::About => "/about",
            Route::Api => "/api",
            Route::Contact => "/contact",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
        }
    }

    /// Get the display title for this route.
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::About => "About",
            Route::Api => "API",
            Route::Contact => "Contact",
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Dashboard => "Dashboard",
            Route::Admin => "Admin",
        }
    }

    /// Match a URL path. Trailing slashes and a query string are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|r| r.path() == normalized)
    }

    /// Apply the route table guards for the current session.
    ///
    /// - `/login` and `/register` send logged-in users to `/dashboard`
    /// - `/dashboard` and `/admin` send anonymous users to `/login`
    /// - `/admin` sends non-privileged users to `/dashboard`
    pub fn guard(self, logged_in: bool, is_admin: bool) -> Route {
        match self {
            Route::Login | Route::Register if logged_in => Route::Dashboard,
            Route::Dashboard | Route::Admin if !logged_in => Route::Login,
            Route::Admin if !is_admin => Route::Dashboard,
            other => other,
        }
    }

    /// Resolve a raw path through the route table. Unknown paths go home.
    pub fn resolve(path: &str, logged_in: bool, is_admin: bool) -> Route {
        Route::from_path(path)
            .unwrap_or(Route::Home)
            .guard(logged_in, is_admin)
    }
}

/// How a navigation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// In-app navigation; in-memory state is kept.
    Push,
    /// Hard redirect; the front end reloads and rebuilds session state
    /// from storage.
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub kind: NavigationKind,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route, kind: NavigationKind);
}

/// Navigator that records every navigation in order.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<Navigation>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Navigation> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .copied()
    }

    /// Drain recorded navigations.
    pub fn take(&self) -> Vec<Navigation> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Navigator for History {
    fn navigate(&self, route: Route, kind: NavigationKind) {
        debug!(path = route.path(), ?kind, "Navigate");
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Navigation { route, kind });
    }
}
