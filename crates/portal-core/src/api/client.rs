//! API client for communicating with the template backend.
//!
//! This module provides the `ApiClient` struct. Every request goes through
//! the same pipeline: default headers, request middleware in order, send,
//! response middleware in order, then status check.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::TokenStore;
use crate::navigation::Navigator;

use super::middleware::{BearerAuth, LogoutOnUnauthorized, RequestMiddleware, ResponseMiddleware};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Body of an outbound request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

/// Builder for `ApiClient`. Middleware runs in the order it is added.
pub struct ApiClientBuilder {
    base_url: String,
    default_headers: HeaderMap,
    timeout: Duration,
    request_middleware: Vec<Arc<dyn RequestMiddleware>>,
    response_middleware: Vec<Arc<dyn ResponseMiddleware>>,
}

impl ApiClientBuilder {
    fn new(base_url: &str) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.to_string(),
            default_headers,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            request_middleware: Vec::new(),
            response_middleware: Vec::new(),
        }
    }

    /// Merge headers sent with every request. Later values replace earlier ones.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.default_headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn request_middleware(mut self, middleware: impl RequestMiddleware + 'static) -> Self {
        self.request_middleware.push(Arc::new(middleware));
        self
    }

    pub fn response_middleware(mut self, middleware: impl ResponseMiddleware + 'static) -> Self {
        self.response_middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(self.default_headers)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(ApiClient {
            client,
            base_url,
            request_middleware: self.request_middleware.into(),
            response_middleware: self.response_middleware.into(),
        })
    }
}

/// API client for the template backend.
/// Clone is cheap - reqwest::Client and the middleware lists are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    request_middleware: Arc<[Arc<dyn RequestMiddleware>]>,
    response_middleware: Arc<[Arc<dyn ResponseMiddleware>]>,
}

impl ApiClient {
    pub fn builder(base_url: &str) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Client with a base endpoint and default headers, no middleware.
    pub fn configure(base_url: &str, default_headers: HeaderMap) -> Result<Self, ApiError> {
        Self::builder(base_url).default_headers(default_headers).build()
    }

    /// Client wired with the standard session middleware: bearer token on
    /// the way out, logout-and-redirect on 401 on the way back. There is no
    /// in-memory session here; `SessionProvider::new` builds a client that
    /// also updates one.
    pub fn with_session(
        base_url: &str,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Self::builder(base_url)
            .request_middleware(BearerAuth::new(store.clone()))
            .response_middleware(LogoutOnUnauthorized::new(store, navigator))
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request through the middleware pipeline.
    ///
    /// Non-2xx responses become `ApiError::Http` after response middleware
    /// has seen them.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let builder = self.client.request(method.clone(), &url);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
        };
        // Builder errors, here or from `execute`, convert to `InvalidRequest`
        let mut request = builder.build()?;

        for middleware in self.request_middleware.iter() {
            middleware.on_request(&mut request)?;
        }

        debug!(%method, url = %url, "Sending request");
        let response = self.client.execute(request).await?;
        debug!(%method, url = %url, status = %response.status(), "Received response");

        for middleware in self.response_middleware.iter() {
            middleware.on_response(&response);
        }

        Self::check_response(response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, url)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path, RequestBody::Empty).await?;
        Self::decode(response, path).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        let response = self.request(Method::POST, path, RequestBody::Json(value)).await?;
        Self::decode(response, path).await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let pairs = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let response = self.request(Method::POST, path, RequestBody::Form(pairs)).await?;
        Self::decode(response, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::builder("http://localhost:8000/api/v1/")
            .build()
            .expect("client should build");

        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(client.url("/users/me"), "http://localhost:8000/api/v1/users/me");
        assert_eq!(client.url("register"), "http://localhost:8000/api/v1/register");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::configure("not a url", HeaderMap::new());
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }
}
