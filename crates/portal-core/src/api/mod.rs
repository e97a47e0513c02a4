//! REST API client module for the template backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend's `/api/v1` routes, plus the middleware that attaches the
//! bearer token and reacts to authorization failures.
//!
//! The API uses JWT bearer token authentication obtained through
//! the `/login/access-token` form endpoint.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod middleware;

pub use client::{ApiClient, ApiClientBuilder, RequestBody};
pub use endpoints::{DemoEndpoint, ProbeResult, DEMO_ENDPOINTS};
pub use error::ApiError;
pub use middleware::{BearerAuth, LogoutOnUnauthorized, RequestMiddleware, ResponseMiddleware};
