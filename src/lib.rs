//! # Scholarship Portal Client (Session & Authorization)
//!
//! `scholarship_client` is the client side of the scholarship portal. It owns
//! the one part of the client with real state: establishing, persisting,
//! verifying and tearing down an authenticated identity, attaching that
//! identity to outbound requests, and gating navigation to role-restricted
//! views.
//!
//! ## Session Lifecycle
//!
//! The session is a tri-state value (`Initializing`, `Anonymous`,
//! `Authenticated`). `Initializing` is visited once per process while a stored
//! bearer token is checked against `GET /api/profile/`. Guards never decide
//! while the state is `Initializing`, so protected views cannot flash and
//! redirects cannot fire early.
//!
//! ## Credentials
//!
//! A single bearer token is kept in a durable store (a JSON file for the CLI
//! host) and mirrored into the default `Authorization` header of the shared
//! API client. Both are written only by the auth controller, always in the
//! order store, header, state.
//!
//! Token material is held in `secrecy` types and must never be logged.

#[path = "lib/mod.rs"]
pub mod app_lib;
pub mod cli;
pub mod features;
pub mod routes;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
