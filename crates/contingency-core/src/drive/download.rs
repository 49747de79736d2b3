//! Single-file download with media/export dispatch.

use super::api::DriveApi;
use super::types::{RemoteFile, TransferMode};
use super::DriveError;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Progress after a chunk has been written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes: u64,
    pub total: Option<u64>,
    /// Unknown while the server gives no size; 100 once done
    pub percent: Option<u8>,
    pub done: bool,
}

/// Outcome of a finished download
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub file: RemoteFile,
    pub destination: PathBuf,
    pub mode: TransferMode,
    pub bytes: u64,
}

/// Local path for a remote file.
///
/// - no destination: the remote name, relative to the working directory
/// - a directory: the remote name inside it
/// - anything else: used as is
///
/// Spreadsheet exports always end in `.xlsx`.
pub fn resolve_destination(remote_name: &str, mime_type: &str, destination: Option<&Path>) -> PathBuf {
    let name = safe_file_name(remote_name);
    let path = match destination {
        None => PathBuf::from(name),
        Some(dir) if dir.is_dir() => dir.join(name),
        Some(path) => path.to_path_buf(),
    };

    match TransferMode::for_mime_type(mime_type).required_extension() {
        Some(ext) if !has_extension(&path, ext) => {
            let mut with_ext = path.into_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            PathBuf::from(with_ext)
        }
        _ => path,
    }
}

/// Remote names may contain separators; they must not leave the target directory.
fn safe_file_name(remote_name: &str) -> String {
    let name: String = remote_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match name.trim() {
        "" | "." | ".." => "untitled".to_string(),
        _ => name,
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn percent(bytes: u64, total: Option<u64>) -> Option<u8> {
    match total {
        Some(0) => Some(100),
        Some(total) => Some((bytes.saturating_mul(100) / total).min(100) as u8),
        None => None,
    }
}

/// Read until `buf` is full or the stream ends.
fn fill_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub struct Downloader<A> {
    api: A,
    chunk_size: usize,
}

impl<A: DriveApi> Downloader<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Download one file, reporting progress after every chunk.
    ///
    /// Native spreadsheets are exported as XLSX, everything else is
    /// fetched as raw media. Nothing is retried.
    pub fn download<F>(
        &self,
        file_id: &str,
        destination: Option<&Path>,
        mut on_progress: F,
    ) -> Result<DownloadReport, DriveError>
    where
        F: FnMut(&TransferProgress),
    {
        let file = self.api.get_metadata(file_id)?;
        tracing::info!("File type: {} ({})", file.mime_type, file.name);

        let destination = resolve_destination(&file.name, &file.mime_type, destination);
        let mode = TransferMode::for_mime_type(&file.mime_type);
        tracing::debug!("Transfer mode {:?} -> {}", mode, destination.display());

        let mut stream = self.api.fetch(file_id, &mode)?;
        let total = match mode {
            TransferMode::Media => stream.total_size.or_else(|| file.size_bytes()),
            TransferMode::Export { .. } => stream.total_size,
        };

        let mut output = File::create(&destination)?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut bytes = 0u64;
        let mut reported_done = false;

        loop {
            let n = fill_chunk(stream.reader.as_mut(), &mut buf).map_err(DriveError::Stream)?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n])?;
            bytes += n as u64;

            let done = total.is_some_and(|t| bytes >= t);
            on_progress(&TransferProgress {
                bytes,
                total,
                percent: percent(bytes, total),
                done,
            });
            reported_done = done;
            tracing::debug!("Chunk written, {} bytes so far", bytes);
        }
        output.flush()?;

        if let Some(expected) = total {
            if bytes < expected {
                return Err(DriveError::Incomplete {
                    expected,
                    actual: bytes,
                });
            }
        }

        if !reported_done {
            on_progress(&TransferProgress {
                bytes,
                total,
                percent: Some(100),
                done: true,
            });
        }

        tracing::info!("Downloaded {} bytes to {}", bytes, destination.display());
        Ok(DownloadReport {
            file,
            destination,
            mode,
            bytes,
        })
    }
}
