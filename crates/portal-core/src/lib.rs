//! Portal core library.
//!
//! Client-side session handling for the full-stack template API:
//! an HTTP client with ordered request/response middleware, persisted
//! bearer token storage, and a session provider that tracks who is
//! logged in.
//!
//! ```text
//! SessionProvider ──► ApiClient ──► [BearerAuth] ──► HTTP
//!        │                 ◄── [LogoutOnUnauthorized] ◄──┘
//!        └─► TokenStore, Navigator
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthState, Session, SessionProvider, TokenStore};
pub use config::Config;
pub use navigation::{History, NavigationKind, Navigator, Route};
