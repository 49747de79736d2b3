//! DriveApi trait - abstraction over the remote storage API.
//!
//! Only the four calls this tool needs. The REST client implements it;
//! tests use an in-memory fake.

use super::types::{NewFile, RemoteFile, TransferMode};
use super::DriveError;
use std::io::Read;
use std::path::Path;

/// Content body of a download
pub struct MediaStream {
    pub reader: Box<dyn Read>,
    /// Size when the server advertises one
    pub total_size: Option<u64>,
}

impl MediaStream {
    pub fn new(reader: impl Read + 'static, total_size: Option<u64>) -> Self {
        Self {
            reader: Box::new(reader),
            total_size,
        }
    }
}

pub trait DriveApi {
    /// Fetch id, name, mimeType (and size when known)
    fn get_metadata(&self, file_id: &str) -> Result<RemoteFile, DriveError>;

    /// Open the content of a file, as raw media or exported
    fn fetch(&self, file_id: &str, mode: &TransferMode) -> Result<MediaStream, DriveError>;

    /// Create a new file from local content, returning the created file
    fn create_file(&self, metadata: &NewFile, content: &Path) -> Result<RemoteFile, DriveError>;

    /// Replace the content of an existing file, returning its id
    fn update_file(
        &self,
        file_id: &str,
        content: &Path,
        mime_type: &str,
    ) -> Result<String, DriveError>;
}

impl<T: DriveApi + ?Sized> DriveApi for &T {
    fn get_metadata(&self, file_id: &str) -> Result<RemoteFile, DriveError> {
        (**self).get_metadata(file_id)
    }

    fn fetch(&self, file_id: &str, mode: &TransferMode) -> Result<MediaStream, DriveError> {
        (**self).fetch(file_id, mode)
    }

    fn create_file(&self, metadata: &NewFile, content: &Path) -> Result<RemoteFile, DriveError> {
        (**self).create_file(metadata, content)
    }

    fn update_file(
        &self,
        file_id: &str,
        content: &Path,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        (**self).update_file(file_id, content, mime_type)
    }
}
