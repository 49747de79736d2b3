use serde::{Deserialize, Serialize};

/// Native Google Sheets document
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
/// Excel workbook, the export target for Sheets
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLSX_EXTENSION: &str = "xlsx";

/// Drive file metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Byte size as a decimal string; absent for native Google documents
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub drive_id: Option<String>,
}

impl RemoteFile {
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_spreadsheet(&self) -> bool {
        self.mime_type == SPREADSHEET_MIME_TYPE
    }
}

/// How file content is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMode {
    /// Raw bytes (`alt=media`)
    Media,
    /// Server-side conversion of a native document
    Export { mime_type: String },
}

impl TransferMode {
    pub fn for_mime_type(mime_type: &str) -> Self {
        if mime_type == SPREADSHEET_MIME_TYPE {
            TransferMode::Export {
                mime_type: XLSX_MIME_TYPE.to_string(),
            }
        } else {
            TransferMode::Media
        }
    }

    /// Extension the local file must carry, if any.
    pub fn required_extension(&self) -> Option<&'static str> {
        match self {
            TransferMode::Export { mime_type } if mime_type == XLSX_MIME_TYPE => {
                Some(XLSX_EXTENSION)
            }
            _ => None,
        }
    }
}

/// Metadata for a file to create
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    pub parents: Vec<String>,
    #[serde(skip)]
    pub mime_type: String,
}
