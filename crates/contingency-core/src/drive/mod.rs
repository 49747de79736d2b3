//! Drive module - single-file transfers against Google Drive.
//!
//! This module contains:
//! - DriveApi trait, the narrow seam onto the remote API
//! - DriveClient, its REST implementation (Drive API v3)
//! - Downloader with media/export dispatch and chunked progress
//! - Uploader for create and overwrite

pub mod api;
pub mod client;
pub mod download;
pub mod mime;
pub mod types;
pub mod upload;

pub use api::{DriveApi, MediaStream};
pub use client::DriveClient;
pub use download::{resolve_destination, DownloadReport, Downloader, TransferProgress};
pub use types::{NewFile, RemoteFile, TransferMode};
pub use upload::Uploader;

use thiserror::Error;

/// Errors that can occur during Drive operations.
#[derive(Error, Debug)]
pub enum DriveError {
    /// File id unknown or not visible to the caller.
    #[error("File not found: {file_id}")]
    NotFound { file_id: String },

    /// Any other non-success status.
    #[error("Drive API error {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS or body read failure.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading the response body failed mid-transfer.
    #[error("Network error while reading content: {0}")]
    Stream(std::io::Error),

    /// Body ended before the advertised size.
    #[error("Incomplete transfer: expected {expected} bytes, got {actual}")]
    Incomplete { expected: u64, actual: u64 },

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Drive response: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriveError {
    /// Failures on the remote side of the transfer. Local I/O is not
    /// remote and is left to propagate.
    pub fn is_remote(&self) -> bool {
        match self {
            DriveError::NotFound { .. } => true,
            DriveError::Http { .. } => true,
            DriveError::Transport(_) => true,
            DriveError::Stream(_) => true,
            DriveError::Incomplete { .. } => true,
            DriveError::Json(_) => true,
            DriveError::Io(_) => false,
        }
    }
}
