//! Integration tests for download and upload against an in-memory Drive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use contingency_core::drive::types::{SPREADSHEET_MIME_TYPE, XLSX_MIME_TYPE};
use contingency_core::drive::{
    DriveApi, DriveError, Downloader, MediaStream, NewFile, RemoteFile, TransferMode,
    TransferProgress, Uploader,
};
use tempfile::TempDir;

const SHARED_DRIVE: &str = "0AN-_u73BpXB9Uk9PVA";

struct StoredFile {
    meta: RemoteFile,
    content: Vec<u8>,
}

/// In-memory Drive that records which calls were made.
#[derive(Default)]
struct FakeDrive {
    files: RefCell<HashMap<String, StoredFile>>,
    fetches: RefCell<Vec<(String, TransferMode)>>,
    created_mime_types: RefCell<Vec<String>>,
    /// Advertise this size instead of the real one
    advertised_size: Option<u64>,
}

impl FakeDrive {
    fn with_file(self, id: &str, name: &str, mime_type: &str, content: &[u8]) -> Self {
        self.files.borrow_mut().insert(
            id.to_string(),
            StoredFile {
                meta: RemoteFile {
                    id: id.to_string(),
                    name: name.to_string(),
                    mime_type: mime_type.to_string(),
                    size: Some(content.len().to_string()).filter(|_| mime_type != SPREADSHEET_MIME_TYPE),
                    drive_id: None,
                },
                content: content.to_vec(),
            },
        );
        self
    }

    fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(id).map(|f| f.content.clone())
    }

    fn not_found(file_id: &str) -> DriveError {
        DriveError::NotFound {
            file_id: file_id.to_string(),
        }
    }
}

impl DriveApi for FakeDrive {
    fn get_metadata(&self, file_id: &str) -> Result<RemoteFile, DriveError> {
        self.files
            .borrow()
            .get(file_id)
            .map(|f| f.meta.clone())
            .ok_or_else(|| Self::not_found(file_id))
    }

    fn fetch(&self, file_id: &str, mode: &TransferMode) -> Result<MediaStream, DriveError> {
        self.fetches
            .borrow_mut()
            .push((file_id.to_string(), mode.clone()));
        let files = self.files.borrow();
        let file = files.get(file_id).ok_or_else(|| Self::not_found(file_id))?;
        let size = self.advertised_size.unwrap_or(file.content.len() as u64);
        Ok(MediaStream::new(Cursor::new(file.content.clone()), Some(size)))
    }

    fn create_file(&self, metadata: &NewFile, content: &Path) -> Result<RemoteFile, DriveError> {
        let content = std::fs::read(content)?;
        let id = format!("created-{}", self.files.borrow().len());
        let meta = RemoteFile {
            id: id.clone(),
            name: metadata.name.clone(),
            mime_type: metadata.mime_type.clone(),
            size: Some(content.len().to_string()),
            drive_id: Some(SHARED_DRIVE.to_string()),
        };
        self.created_mime_types
            .borrow_mut()
            .push(metadata.mime_type.clone());
        self.files
            .borrow_mut()
            .insert(id, StoredFile { meta: meta.clone(), content });
        Ok(meta)
    }

    fn update_file(
        &self,
        file_id: &str,
        content: &Path,
        _mime_type: &str,
    ) -> Result<String, DriveError> {
        let content = std::fs::read(content)?;
        let mut files = self.files.borrow_mut();
        let file = files.get_mut(file_id).ok_or_else(|| Self::not_found(file_id))?;
        file.content = content;
        Ok(file_id.to_string())
    }
}

// ===========================================================================
// Download
// ===========================================================================

#[test]
fn test_spreadsheet_is_exported_as_xlsx() {
    let temp_dir = TempDir::new().expect("tempdir");
    let drive = FakeDrive::default().with_file(
        "1XLApkX7orYBMbYERS89oR_6K5KDkwgUf",
        "Base Contingencia",
        SPREADSHEET_MIME_TYPE,
        b"PK\x03\x04 workbook",
    );

    let report = Downloader::new(&drive)
        .download("1XLApkX7orYBMbYERS89oR_6K5KDkwgUf", Some(temp_dir.path()), |_| {})
        .expect("download");

    assert_eq!(report.destination, temp_dir.path().join("Base Contingencia.xlsx"));
    assert_eq!(
        report.mode,
        TransferMode::Export {
            mime_type: XLSX_MIME_TYPE.to_string()
        }
    );
    assert_eq!(
        std::fs::read(&report.destination).expect("read"),
        b"PK\x03\x04 workbook"
    );
    assert_eq!(drive.fetches.borrow()[0].1, report.mode);
}

#[test]
fn test_binary_file_is_fetched_as_media() {
    let temp_dir = TempDir::new().expect("tempdir");
    let target = temp_dir.path().join("copy.pdf");
    let drive = FakeDrive::default().with_file("pdf1", "Report.pdf", "application/pdf", b"%PDF-1.7");

    let report = Downloader::new(&drive)
        .download("pdf1", Some(target.as_path()), |_| {})
        .expect("download");

    assert_eq!(report.mode, TransferMode::Media);
    assert_eq!(report.destination, target);
    assert_eq!(report.bytes, 8);
    assert_eq!(std::fs::read(&target).expect("read"), b"%PDF-1.7");
}

#[test]
fn test_progress_reaches_100() {
    let temp_dir = TempDir::new().expect("tempdir");
    let content = vec![7u8; 10_000];
    let drive = FakeDrive::default().with_file("big", "big.bin", "application/octet-stream", &content);

    let mut reports: Vec<TransferProgress> = Vec::new();
    Downloader::new(&drive)
        .with_chunk_size(4096)
        .download("big", Some(temp_dir.path()), |p| reports.push(p.clone()))
        .expect("download");

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].percent, Some(40));
    let last = reports.last().expect("final report");
    assert!(last.done);
    assert_eq!(last.percent, Some(100));
    assert_eq!(last.bytes, 10_000);
    assert!(reports.windows(2).all(|w| w[0].bytes <= w[1].bytes));
}

#[test]
fn test_empty_file_still_reports_done() {
    let temp_dir = TempDir::new().expect("tempdir");
    let drive = FakeDrive::default().with_file("empty", "empty.txt", "text/plain", b"");

    let mut reports: Vec<TransferProgress> = Vec::new();
    let report = Downloader::new(&drive)
        .download("empty", Some(temp_dir.path()), |p| reports.push(p.clone()))
        .expect("download");

    assert_eq!(report.bytes, 0);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].done);
    assert!(report.destination.exists());
}

#[test]
fn test_unknown_id_is_not_found_and_writes_nothing() {
    let temp_dir = TempDir::new().expect("tempdir");
    let drive = FakeDrive::default();

    let err = Downloader::new(&drive)
        .download("missing", Some(temp_dir.path()), |_| {})
        .unwrap_err();

    assert!(matches!(err, DriveError::NotFound { ref file_id } if file_id == "missing"));
    assert!(err.is_remote());
    assert_eq!(std::fs::read_dir(temp_dir.path()).expect("read dir").count(), 0);
}

#[test]
fn test_short_body_is_incomplete() {
    let temp_dir = TempDir::new().expect("tempdir");
    let drive = FakeDrive {
        advertised_size: Some(100),
        ..FakeDrive::default()
    }
    .with_file("short", "short.bin", "application/octet-stream", b"only ten b");

    let err = Downloader::new(&drive)
        .download("short", Some(temp_dir.path()), |_| {})
        .unwrap_err();

    assert!(matches!(
        err,
        DriveError::Incomplete {
            expected: 100,
            actual: 10
        }
    ));
}

// ===========================================================================
// Upload
// ===========================================================================

#[test]
fn test_create_returns_new_id() {
    let temp_dir = TempDir::new().expect("tempdir");
    let local = temp_dir.path().join("Muestra para Bot Contingencia.xlsx");
    std::fs::write(&local, b"PK\x03\x04 sample").expect("write");
    let drive = FakeDrive::default();

    let id = Uploader::new(&drive)
        .create(&local, "Muestra para Bot Contingencia.xlsx", "1rqcGlQyKsDFkmGvniP22222mLJk90Czx", Some(SHARED_DRIVE))
        .expect("create");

    assert_eq!(drive.content(&id).as_deref(), Some(&b"PK\x03\x04 sample"[..]));
    assert_eq!(drive.created_mime_types.borrow()[0], XLSX_MIME_TYPE);
}

#[test]
fn test_overwrite_returns_same_id() {
    let temp_dir = TempDir::new().expect("tempdir");
    let local = temp_dir.path().join("Muestra para Bot Contingencia.csv");
    std::fs::write(&local, b"NRO_IDENTIFICACION\n42\n").expect("write");
    let drive = FakeDrive::default().with_file("sheet1", "Muestra", "text/csv", b"old");

    let id = Uploader::new(&drive)
        .overwrite(&local, "sheet1")
        .expect("overwrite");

    assert_eq!(id, "sheet1");
    assert_eq!(
        drive.content("sheet1").as_deref(),
        Some(&b"NRO_IDENTIFICACION\n42\n"[..])
    );
}

#[test]
fn test_overwrite_unknown_id_is_not_found() {
    let temp_dir = TempDir::new().expect("tempdir");
    let local = temp_dir.path().join("data.csv");
    std::fs::write(&local, b"a\n").expect("write");
    let drive = FakeDrive::default();

    let err = Uploader::new(&drive).overwrite(&local, "nope").unwrap_err();
    assert!(matches!(err, DriveError::NotFound { .. }));
}

#[test]
fn test_upload_of_missing_local_file_is_local_error() {
    let temp_dir = TempDir::new().expect("tempdir");
    let drive = FakeDrive::default();

    let err = Uploader::new(&drive)
        .create(&temp_dir.path().join("absent.xlsx"), "absent.xlsx", "folder", None)
        .unwrap_err();
    assert!(matches!(err, DriveError::Io(_)));
    assert!(!err.is_remote());

    let err = Uploader::new(&drive)
        .overwrite(temp_dir.path(), "any")
        .unwrap_err();
    assert!(matches!(err, DriveError::Io(_)));
}
