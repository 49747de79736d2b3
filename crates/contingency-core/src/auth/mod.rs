//! Auth module - OAuth credentials for the Drive API.
//!
//! This module contains:
//! - Credential bundle and validity rules
//! - Client secret parsing
//! - Locked, atomically written token cache
//! - Installed-app loopback flow and token refresh
//! - CredentialManager tying the lifecycle together

pub mod cache;
pub mod client_secret;
pub mod credentials;
pub mod flow;
pub mod manager;

pub use cache::{TokenCache, TokenCacheLease};
pub use client_secret::ClientSecret;
pub use credentials::Credential;
pub use flow::OAuthAuthorizer;
pub use manager::{Authorizer, CredentialAction, CredentialManager};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while obtaining credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Client secret file missing or malformed.
    #[error("Invalid client secret: {0}")]
    ClientSecret(String),

    /// Another run holds the token cache.
    #[error("Token cache {} is locked by {owner}", path.display())]
    CacheLocked { path: PathBuf, owner: String },

    /// The user or provider refused authorization.
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// Redirect carried a state we did not issue.
    #[error("OAuth state mismatch in redirect")]
    StateMismatch,

    /// Token endpoint rejected the request.
    #[error("Token endpoint error {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
