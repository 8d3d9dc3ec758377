//! # API Shared
//!
//! Shared utilities and definitions for the Odyssey APIs.
//!
//! Contains:
//! - Request and response bodies (`dto` module)
//! - The `HealthService` used by the REST server and the CLI
//! - Bearer token verification
//!
//! Used by `api-rest` and the `odyssey` CLI for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{AuthError, StaticTokenVerifier, TokenVerifier};
pub use dto::*;
pub use health::HealthService;
