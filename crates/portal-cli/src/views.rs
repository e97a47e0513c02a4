//! Plain-text rendering for each route.
//!
//! Views only read the session snapshot they are given; they never call
//! the API or change state themselves.

use std::fmt::Write;

use portal_core::api::{ProbeResult, DEMO_ENDPOINTS};
use portal_core::models::ApiStatus;
use portal_core::utils::truncate_string;
use portal_core::{Route, Session};

/// Longest probe response body shown on the API page
const MAX_BODY_PREVIEW: usize = 300;

/// Everything a view may show.
pub struct ViewContext<'a> {
    pub session: &'a Session,
    pub logged_in: bool,
    pub api_status: Option<ApiStatus>,
    pub base_url: &'a str,
    /// Probe outcomes for the API page, in `DEMO_ENDPOINTS` order
    pub probes: &'a [ProbeResult],
}

pub fn render(route: Route, ctx: &ViewContext<'_>) -> String {
    let mut out = navbar(route, ctx);
    out.push('\n');
    let body = match route {
        Route::Home => home(ctx),
        Route::About => about(),
        Route::Api => api(ctx),
        Route::Contact => contact(),
        Route::Login => login(ctx),
        Route::Register => register(ctx),
        Route::Dashboard => dashboard(ctx),
        Route::Admin => admin(ctx),
    };
    out.push_str(&body);
    out
}

fn navbar(current: Route, ctx: &ViewContext<'_>) -> String {
    let mut links: Vec<String> = [Route::Home, Route::About, Route::Api, Route::Contact]
        .iter()
        .map(|r| mark(*r, current))
        .collect();

    if ctx.logged_in {
        links.push(mark(Route::Dashboard, current));
        let name = ctx
            .session
            .user()
            .map(|u| u.display_name().to_string())
            .unwrap_or_default();
        links.push(format!("Logout ({})", name));
    } else {
        links.push(mark(Route::Login, current));
        links.push(mark(Route::Register, current));
    }

    let mut line = links.join(" | ");
    if ctx.logged_in {
        if let Some(status) = ctx.api_status {
            let _ = write!(line, "    API: {}", status.label());
        }
    }
    line
}

fn mark(route: Route, current: Route) -> String {
    if route == current {
        format!("[{}]", route.title())
    } else {
        route.title().to_string()
    }
}

fn home(ctx: &ViewContext<'_>) -> String {
    let status = match ctx.api_status {
        Some(status) => status.label(),
        None => "Checking...",
    };
    format!(
        "FastAPI Demo\n\
         A modern full-stack template: FastAPI backend, typed client, JWT auth.\n\n\
         - Fast & Modern: async Python API with OpenAPI docs\n\
         - Secure: JWT authentication and password hashing\n\
         - Database Ready: PostgreSQL with migrations\n\n\
         API status: {}\n",
        status
    )
}

fn about() -> String {
    "About\n\
     This template pairs a FastAPI backend with a client that handles\n\
     token exchange, the current-user profile, and session restore.\n"
        .to_string()
}

fn contact() -> String {
    "Contact\n\
     Email: info@example.com (we respond within 24 hours)\n"
        .to_string()
}

fn api(ctx: &ViewContext<'_>) -> String {
    let mut out = String::from("API endpoints\n");
    for (i, endpoint) in DEMO_ENDPOINTS.iter().enumerate() {
        let _ = writeln!(out, "\n{} {}", endpoint.method, endpoint.path);
        let _ = writeln!(out, "  {}", endpoint.description);
        let _ = writeln!(out, "  $ {}", endpoint.curl_example(ctx.base_url));

        match ctx.probes.get(i) {
            Some(ProbeResult::Success { status, body }) => {
                let body = truncate_string(&body.to_string(), MAX_BODY_PREVIEW);
                let _ = writeln!(out, "  ✓ {} {}", status, body);
            }
            Some(ProbeResult::Failure { status, error }) => {
                let status = status.map(|s| s.to_string()).unwrap_or_else(|| "---".to_string());
                let _ = writeln!(out, "  ✗ {} {}", status, error);
            }
            Some(ProbeResult::Skipped) | None => {}
        }
    }
    out
}

fn error_line(ctx: &ViewContext<'_>) -> String {
    ctx.session
        .error
        .as_ref()
        .map(|e| format!("\nError: {}\n", e))
        .unwrap_or_default()
}

fn login(ctx: &ViewContext<'_>) -> String {
    format!(
        "Sign in to your account\n\
         Run `portal login` to sign in, or `portal register` to create an account.\n{}",
        error_line(ctx)
    )
}

fn register(ctx: &ViewContext<'_>) -> String {
    format!(
        "Create your account\n\
         Run `portal register --email <EMAIL> --full-name <NAME>`.\n{}",
        error_line(ctx)
    )
}

fn dashboard(ctx: &ViewContext<'_>) -> String {
    let Some(user) = ctx.session.user() else {
        return "Loading...\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "Welcome back, {}!", user.display_name());
    let _ = writeln!(out, "\nYour Account Information");
    let _ = writeln!(out, "  Full Name: {}", user.full_name);
    let _ = writeln!(out, "  Email:     {}", user.email);
    let _ = writeln!(out, "  Status:    {}", user.status_label());
    let _ = writeln!(out, "  Role:      {}", user.role_label());
    if user.is_superuser {
        let _ = writeln!(out, "\nAdmin panel: `portal open /admin`");
    }
    out
}

fn admin(ctx: &ViewContext<'_>) -> String {
    let name = ctx
        .session
        .user()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();
    format!(
        "Administration\n\
         Signed in as {} (Administrator).\n\
         User management is available in the backend's admin interface.\n",
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::auth::AuthState;
    use portal_core::models::UserProfile;

    fn user(is_superuser: bool) -> UserProfile {
        UserProfile {
            id: "1".to_string(),
            email: "a@b.com".to_string(),
            full_name: "A B".to_string(),
            is_active: true,
            is_superuser,
        }
    }

    fn ctx<'a>(session: &'a Session, logged_in: bool) -> ViewContext<'a> {
        ViewContext {
            session,
            logged_in,
            api_status: Some(ApiStatus::Online),
            base_url: "http://localhost:8000/api/v1",
            probes: &[],
        }
    }

    #[test]
    fn test_navbar_anonymous() {
        let session = Session { state: AuthState::Anonymous, error: None };
        let out = render(Route::Login, &ctx(&session, false));
        let navbar = out.lines().next().unwrap();

        assert_eq!(navbar, "Home | About | API | Contact | [Login] | Register");
    }

    #[test]
    fn test_navbar_logged_in_shows_status() {
        let session = Session { state: AuthState::Authenticated(user(false)), error: None };
        let out = render(Route::Dashboard, &ctx(&session, true));

        assert!(out.starts_with("Home | About | API | Contact | [Dashboard] | Logout (A B)    API: Online"));
        assert!(out.contains("Welcome back, A B!"));
        assert!(out.contains("Role:      User"));
        assert!(!out.contains("Admin panel"));
    }

    #[test]
    fn test_login_view_shows_error() {
        let session = Session {
            state: AuthState::Anonymous,
            error: Some("Incorrect email or password".to_string()),
        };
        let out = render(Route::Login, &ctx(&session, false));

        assert!(out.contains("Error: Incorrect email or password"));
    }

    #[test]
    fn test_api_view_shows_probe_results() {
        let session = Session { state: AuthState::Anonymous, error: None };
        let probes = vec![
            ProbeResult::Success { status: 200, body: serde_json::json!(true) },
            ProbeResult::Failure { status: Some(401), error: "Not authenticated".to_string() },
        ];
        let mut view = ctx(&session, false);
        view.probes = probes.as_slice();
        let out = render(Route::Api, &view);

        assert!(out.contains("GET /utils/health-check/"));
        assert!(out.contains("✓ 200 true"));
        assert!(out.contains("✗ 401 Not authenticated"));
        assert!(out.contains("curl -X POST"));
    }
}
