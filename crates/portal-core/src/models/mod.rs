//! Data models for the template API.
//!
//! These structs mirror the JSON payloads exchanged with the backend's
//! auth routes.

pub mod user;

pub use user::{ApiStatus, Credentials, NewAccount, TokenResponse, UserProfile};
