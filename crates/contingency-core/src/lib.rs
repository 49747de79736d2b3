//! Contingency Core Library
//!
//! Core for the contingency bot. Provides:
//! - OAuth credential lifecycle with a locked on-disk token cache
//! - Google Drive download (media or spreadsheet export) and upload
//! - CSV extract transform (projection, masking, sorting) to XLSX/CSV
//! - Lookup of customer records in the sorted extract

pub mod auth;
pub mod config;
pub mod drive;
pub mod lookup;
pub mod transform;
pub mod utils;

// Re-export main types
pub use auth::{AuthError, Credential, CredentialManager};
pub use config::Config;
pub use drive::{DriveApi, DriveClient, DriveError, Downloader, Uploader};
pub use lookup::RecordIndex;
pub use transform::{Table, TransformError};
