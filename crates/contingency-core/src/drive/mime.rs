//! Mime type of a local file for upload.

use super::types::XLSX_MIME_TYPE;
use std::path::Path;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Extensions whose content sniffing is unreliable (zip-based office
/// files look like plain zip, CSV looks like plain text).
const KNOWN_EXTENSIONS: &[(&str, &str)] = &[
    ("xlsx", XLSX_MIME_TYPE),
    ("xls", "application/vnd.ms-excel"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
];

/// Mime type by extension only.
pub fn from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    KNOWN_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Extension table first, then content sniffing, then octet-stream.
pub fn for_path(path: &Path) -> String {
    if let Some(mime) = from_extension(path) {
        return mime.to_string();
    }
    match tree_magic_mini::from_filepath(path) {
        Some(mime) => mime.to_string(),
        None => FALLBACK_MIME_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_table() {
        assert_eq!(
            from_extension(Path::new("Muestra para Bot Contingencia.xlsx")),
            Some(XLSX_MIME_TYPE)
        );
        assert_eq!(
            from_extension(Path::new("Muestra para Bot Contingencia.CSV")),
            Some("text/csv")
        );
        assert_eq!(from_extension(Path::new("archive.bin")), None);
        assert_eq!(from_extension(Path::new("no_extension")), None);
    }

    #[test]
    fn test_for_path_prefers_extension() {
        // Path need not exist when the extension is known
        assert_eq!(for_path(Path::new("/nonexistent/base.csv")), "text/csv");
    }

    #[test]
    fn test_for_path_unknown_is_never_empty() {
        assert!(!for_path(Path::new("/nonexistent/blob")).is_empty());
    }
}
