//! Single-file upload: create under a folder, or overwrite by id.

use super::api::DriveApi;
use super::mime;
use super::types::NewFile;
use super::DriveError;
use std::io::ErrorKind;
use std::path::Path;

pub struct Uploader<A> {
    api: A,
}

/// Local content must be an existing regular file.
fn check_local_file(local_path: &Path) -> Result<(), DriveError> {
    let meta = std::fs::metadata(local_path)?;
    if !meta.is_file() {
        return Err(DriveError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} is not a regular file", local_path.display()),
        )));
    }
    Ok(())
}

impl<A: DriveApi> Uploader<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Create a new file under `parent_folder_id` and return its id.
    ///
    /// When `shared_drive_id` is given, a file that lands in another
    /// drive is logged as a warning.
    pub fn create(
        &self,
        local_path: &Path,
        remote_name: &str,
        parent_folder_id: &str,
        shared_drive_id: Option<&str>,
    ) -> Result<String, DriveError> {
        check_local_file(local_path)?;

        let metadata = NewFile {
            name: remote_name.to_string(),
            parents: vec![parent_folder_id.to_string()],
            mime_type: mime::for_path(local_path),
        };
        tracing::info!(
            "Uploading {} as '{}' ({}) into {}",
            local_path.display(),
            metadata.name,
            metadata.mime_type,
            parent_folder_id
        );

        let created = self.api.create_file(&metadata, local_path)?;

        if let Some(expected) = shared_drive_id {
            match created.drive_id.as_deref() {
                Some(actual) if actual == expected => {}
                actual => tracing::warn!(
                    "File {} landed in drive {:?}, expected shared drive {}",
                    created.id,
                    actual,
                    expected
                ),
            }
        }

        Ok(created.id)
    }

    /// Replace the content of `remote_id` and return its id.
    pub fn overwrite(&self, local_path: &Path, remote_id: &str) -> Result<String, DriveError> {
        check_local_file(local_path)?;

        let mime_type = mime::for_path(local_path);
        tracing::info!(
            "Overwriting {} with {} ({})",
            remote_id,
            local_path.display(),
            mime_type
        );

        self.api.update_file(remote_id, local_path, &mime_type)
    }
}
