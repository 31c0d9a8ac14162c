//! # Authgate
//!
//! `authgate` is a small HTTP gateway in front of a hosted identity provider
//! (Clerk). It exposes a handful of routes that list and register users through
//! the provider's Backend API and reports the caller's authentication context.
//!
//! ## Routes
//!
//! - `GET /` fixed greeting, never authenticated.
//! - `GET /health` build information plus an `X-App` header.
//! - `GET /protected-endpoint` the caller's [`provider::AuthContext`].
//! - `GET /clients` users held by the provider, as `{"users": [...]}`.
//! - `POST /signup` registers `{emailAddress, password}` with a default profile.
//!
//! ## Authentication
//!
//! Session credentials come from `Authorization: Bearer` or the `__session`
//! cookie and are verified locally (RS256) against the provider's JWKS, which
//! is cached and refreshed on unknown `kid`. In `lax` mode an absent or invalid
//! credential yields a signed-out context; in `strict` mode it yields `401`.
//!
//! ## Errors
//!
//! Provider failures surface as `500 {"error": message}`. Missing signup fields
//! are `400`. A panicking handler is reported as `500`, never as `401`.

pub mod api;
pub mod cli;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
