//! Typed calls for the backend's auth and utility routes, plus the
//! catalogue of endpoints shown on the API demo page.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{ApiStatus, Credentials, NewAccount, TokenResponse, UserProfile};

use super::client::{ApiClient, RequestBody};

const LOGIN_PATH: &str = "/login/access-token";
const REGISTER_PATH: &str = "/register";
const CURRENT_USER_PATH: &str = "/users/me";
const HEALTH_CHECK_PATH: &str = "/utils/health-check/";

impl ApiClient {
    /// Exchange credentials for a bearer token. The backend expects an
    /// OAuth2 password form, not JSON.
    pub async fn login_access_token(
        &self,
        credentials: &Credentials,
    ) -> Result<TokenResponse, super::ApiError> {
        self.post_form(
            LOGIN_PATH,
            &[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ],
        )
        .await
    }

    pub async fn register(&self, account: &NewAccount) -> Result<UserProfile, super::ApiError> {
        self.post_json(REGISTER_PATH, account).await
    }

    pub async fn current_user(&self) -> Result<UserProfile, super::ApiError> {
        self.get_json(CURRENT_USER_PATH).await
    }

    /// Online if the health route answers with a 2xx, Offline otherwise.
    pub async fn health_check(&self) -> ApiStatus {
        match self
            .request(Method::GET, HEALTH_CHECK_PATH, RequestBody::Empty)
            .await
        {
            Ok(_) => ApiStatus::Online,
            Err(e) => {
                debug!(error = %e, "Health check failed");
                ApiStatus::Offline
            }
        }
    }

    /// Call a demo endpoint through the shared pipeline so the bearer
    /// middleware applies. Only GET endpoints are probed.
    pub async fn probe(&self, endpoint: &DemoEndpoint) -> ProbeResult {
        if endpoint.method != "GET" {
            return ProbeResult::Skipped;
        }

        match self
            .request(Method::GET, endpoint.path, RequestBody::Empty)
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
                ProbeResult::Success { status, body }
            }
            Err(e) => {
                warn!(path = endpoint.path, error = %e, "Demo endpoint failed");
                ProbeResult::Failure {
                    status: e.status().map(|s| s.as_u16()),
                    error: e.detail().unwrap_or_else(|| e.to_string()),
                }
            }
        }
    }
}

/// An entry on the API demo page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoEndpoint {
    /// Path relative to the API base endpoint
    pub path: &'static str,
    pub method: &'static str,
    pub description: &'static str,
    pub requires_auth: bool,
    /// Arguments for a curl example, after `curl` and before the URL
    pub curl_args: &'static str,
}

impl DemoEndpoint {
    /// A copy-pasteable curl command against `base_url`.
    pub fn curl_example(&self, base_url: &str) -> String {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        if self.curl_args.is_empty() {
            format!("curl {}", url)
        } else {
            format!("curl {} {}", self.curl_args, url)
        }
    }
}

pub const DEMO_ENDPOINTS: &[DemoEndpoint] = &[
    DemoEndpoint {
        path: HEALTH_CHECK_PATH,
        method: "GET",
        description: "Check if the API is running and healthy",
        requires_auth: false,
        curl_args: "",
    },
    DemoEndpoint {
        path: CURRENT_USER_PATH,
        method: "GET",
        description: "Get current user information (requires authentication)",
        requires_auth: true,
        curl_args: "-H \"Authorization: Bearer YOUR_TOKEN\"",
    },
    DemoEndpoint {
        path: "/items/",
        method: "GET",
        description: "Get all items (requires authentication)",
        requires_auth: true,
        curl_args: "-H \"Authorization: Bearer YOUR_TOKEN\"",
    },
    DemoEndpoint {
        path: LOGIN_PATH,
        method: "POST",
        description: "Authenticate user and get access token",
        requires_auth: false,
        curl_args: "-X POST -H \"Content-Type: application/x-www-form-urlencoded\" -d \"username=admin@example.com&password=changethis\"",
    },
    DemoEndpoint {
        path: REGISTER_PATH,
        method: "POST",
        description: "Register a new user",
        requires_auth: false,
        curl_args: "-X POST -H \"Content-Type: application/json\" -d '{\"email\":\"user@example.com\",\"password\":\"password123\",\"full_name\":\"John Doe\"}'",
    },
];

/// Outcome of probing a demo endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Success { status: u16, body: Value },
    Failure { status: Option<u16>, error: String },
    /// Endpoint has side effects and is not called from the demo.
    Skipped,
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success { .. })
    }
}
