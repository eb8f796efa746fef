//! Text extraction for uploads.
//!
//! The retrieval core only ever sees extracted UTF-8 text plus the original
//! filename. Extraction runs on the client side before the document crosses
//! the wire, and a failure here short-circuits the upload.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::ExtractError;

/// Formats we refuse outright rather than misreading as text.
const UNSUPPORTED_EXTENSIONS: [&str; 7] = ["pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx"];

/// Read a document as UTF-8 text, enforcing the upload size cap and
/// rejecting binary content.
pub fn extract_text(path: &Path, max_bytes: u64) -> Result<String, ExtractError> {
    let metadata = fs::metadata(path)?;
    if metadata.len() > max_bytes {
        return Err(ExtractError::TooLarge {
            size: metadata.len(),
            max: max_bytes,
        });
    }

    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ExtractError::UnsupportedFormat(ext));
        }
    }

    if !looks_like_text(path)? {
        return Err(ExtractError::Binary(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => ExtractError::Binary(path.display().to_string()),
        _ => ExtractError::Io(e),
    })
}

/// Sniff the first bytes for binary content (null byte indicator).
fn looks_like_text(path: &Path) -> Result<bool, ExtractError> {
    let mut file = fs::File::open(path)?;
    let mut buffer = [0u8; 512];
    let n = file.read(&mut buffer)?;
    Ok(!buffer[..n].contains(&0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MAX: u64 = 1024;

    #[test]
    fn test_extracts_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "plain text content").unwrap();

        assert_eq!(extract_text(&path, MAX).unwrap(), "plain text content");
    }

    #[test]
    fn test_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(2048)).unwrap();

        assert!(matches!(
            extract_text(&path, MAX),
            Err(ExtractError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(&path, "%PDF-1.7").unwrap();

        assert!(matches!(
            extract_text(&path, MAX),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_rejects_binary_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[b'a', 0u8, b'b', 0u8]).unwrap();

        assert!(matches!(
            extract_text(&path, MAX),
            Err(ExtractError::Binary(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0xC3, 0x28, 0xA0, 0xA1]).unwrap();

        assert!(matches!(
            extract_text(&path, MAX),
            Err(ExtractError::Binary(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");

        assert!(matches!(extract_text(&path, MAX), Err(ExtractError::Io(_))));
    }
}
