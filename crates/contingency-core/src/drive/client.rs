//! Google Drive REST client (API v3).
//!
//! Metadata, media download and upload calls pass `supportsAllDrives=true`
//! so files in shared drives are reachable. The export endpoint does not
//! take that parameter.

use super::api::{DriveApi, MediaStream};
use super::types::{NewFile, RemoteFile, TransferMode};
use super::DriveError;
use crate::auth::Credential;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Google Drive API endpoints
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

const METADATA_FIELDS: &str = "id,name,mimeType,size,driveId";

/// Multipart boundary for create uploads
const BOUNDARY: &str = "----ContingencyBoundary";

/// Blocking Drive client bound to one access token
pub struct DriveClient {
    client: Client,
    access_token: String,
    files_url: String,
    upload_url: String,
}

impl DriveClient {
    pub fn new(credential: &Credential) -> Result<Self, DriveError> {
        Self::with_endpoints(credential, DRIVE_FILES_URL, DRIVE_UPLOAD_URL)
    }

    /// Point the client at other endpoints (proxies, emulators)
    pub fn with_endpoints(
        credential: &Credential,
        files_url: &str,
        upload_url: &str,
    ) -> Result<Self, DriveError> {
        // The blocking client defaults to a 30s timeout; transfers run until done
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self {
            client,
            access_token: credential.access_token.clone(),
            files_url: files_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
        })
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.files_url, file_id)
    }

    fn export_url(&self, file_id: &str) -> String {
        format!("{}/{}/export", self.files_url, file_id)
    }

    /// Map non-success statuses to DriveError
    fn check(response: Response, file_id: &str) -> Result<Response, DriveError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound {
                file_id: file_id.to_string(),
            });
        }
        let body = response.text().unwrap_or_default();
        Err(DriveError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

/// Build a multipart/related body: JSON metadata part, then content part.
pub fn multipart_body(metadata_json: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n",
        boundary = BOUNDARY,
        metadata = metadata_json,
        content_type = content_type,
    );
    let mut body = head.into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--", BOUNDARY).as_bytes());
    body
}

impl DriveApi for DriveClient {
    fn get_metadata(&self, file_id: &str) -> Result<RemoteFile, DriveError> {
        tracing::debug!("GET metadata {}", file_id);
        let response = self
            .client
            .get(self.file_url(file_id))
            .query(&[("fields", METADATA_FIELDS), ("supportsAllDrives", "true")])
            .bearer_auth(&self.access_token)
            .send()?;

        let file: RemoteFile = Self::check(response, file_id)?.json()?;
        Ok(file)
    }

    fn fetch(&self, file_id: &str, mode: &TransferMode) -> Result<MediaStream, DriveError> {
        let request = match mode {
            TransferMode::Media => {
                tracing::debug!("GET media {}", file_id);
                self.client
                    .get(self.file_url(file_id))
                    .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            }
            TransferMode::Export { mime_type } => {
                tracing::debug!("GET export {} as {}", file_id, mime_type);
                self.client
                    .get(self.export_url(file_id))
                    .query(&[("mimeType", mime_type.as_str())])
            }
        };

        let response = Self::check(request.bearer_auth(&self.access_token).send()?, file_id)?;
        let total_size = response.content_length();
        Ok(MediaStream::new(response, total_size))
    }

    fn create_file(&self, metadata: &NewFile, content: &Path) -> Result<RemoteFile, DriveError> {
        let bytes = fs::read(content)?;
        let metadata_json = serde_json::to_string(metadata)?;
        let body = multipart_body(&metadata_json, &metadata.mime_type, &bytes);

        tracing::debug!(
            "POST multipart upload {} ({} bytes)",
            metadata.name,
            bytes.len()
        );
        let response = self
            .client
            .post(&self.upload_url)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", METADATA_FIELDS),
            ])
            .bearer_auth(&self.access_token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", BOUNDARY),
            )
            .body(body)
            .send()?;

        // A 404 here means the parent folder is unknown
        let parent = metadata.parents.first().map(String::as_str).unwrap_or("");
        let file: RemoteFile = Self::check(response, parent)?.json()?;
        Ok(file)
    }

    fn update_file(
        &self,
        file_id: &str,
        content: &Path,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        let bytes = fs::read(content)?;

        tracing::debug!("PATCH media upload {} ({} bytes)", file_id, bytes.len());
        let response = self
            .client
            .patch(format!("{}/{}", self.upload_url, file_id))
            .query(&[
                ("uploadType", "media"),
                ("supportsAllDrives", "true"),
                ("fields", "id"),
            ])
            .bearer_auth(&self.access_token)
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()?;

        #[derive(serde::Deserialize)]
        struct Updated {
            id: String,
        }

        let file: Updated = Self::check(response, file_id)?.json()?;
        Ok(file.id)
    }
}
