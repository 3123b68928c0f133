//! Content type detection for candidate documents.
//!
//! Uses the `infer` crate to detect file types from magic bytes, which works
//! even when files are renamed or have no extension. Only the first 8 KiB of
//! a node is read.

use std::fmt;
use std::io::{self, Read};

use rustc_hash::FxHashSet;

use crate::node::NodeHandle;

/// Number of leading bytes inspected when sniffing content.
pub const SNIFF_LEN: usize = 8 * 1024;

/// MIME type reported for UTF-8 content with no recognizable header.
pub const TEXT_PLAIN: &str = "text/plain";

/// MIME type reported for binary content with no recognizable header.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Decides a node's content type and whether that type is crawlable.
pub trait ContentTypeCheck: Send + Sync + fmt::Debug {
    /// Detects the MIME type of the node's content.
    fn detect(&self, node: &dyn NodeHandle) -> io::Result<String>;

    /// Returns `true` if documents of this MIME type should be surfaced.
    fn is_supported(&self, mime_type: &str) -> bool;
}

/// Magic-byte sniffing with a configurable list of excluded types.
///
/// # Examples
///
/// ```
/// use fc_walker::{ContentTypeCheck, SniffingContentType};
///
/// let check = SniffingContentType::excluding(["video/mp4"]);
/// assert!(check.is_supported("application/pdf"));
/// assert!(!check.is_supported("video/mp4"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SniffingContentType {
    excluded: FxHashSet<String>,
}

impl SniffingContentType {
    /// Creates a check that supports every type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a check that rejects the given MIME types.
    #[must_use]
    pub fn excluding<I, S>(mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded: mime_types
                .into_iter()
                .map(|m| m.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl ContentTypeCheck for SniffingContentType {
    fn detect(&self, node: &dyn NodeHandle) -> io::Result<String> {
        let mut header = Vec::with_capacity(SNIFF_LEN);
        node.open()?.take(SNIFF_LEN as u64).read_to_end(&mut header)?;
        Ok(detect_mime_type(&header).to_owned())
    }

    fn is_supported(&self, mime_type: &str) -> bool {
        !self.excluded.contains(&mime_type.to_ascii_lowercase())
    }
}

/// Detects a MIME type from leading content bytes.
///
/// Falls back to [`TEXT_PLAIN`] for UTF-8 text (a multi-byte sequence cut off
/// at the end of the header still counts) and [`OCTET_STREAM`] otherwise.
///
/// # Examples
///
/// ```
/// use fc_walker::content::detect_mime_type;
///
/// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(detect_mime_type(&png), "image/png");
/// assert_eq!(detect_mime_type(b"plain words"), "text/plain");
/// ```
#[must_use]
pub fn detect_mime_type(header: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(header) {
        return kind.mime_type();
    }
    match std::str::from_utf8(header) {
        Ok(_) => TEXT_PLAIN,
        Err(e) if e.error_len().is_none() => TEXT_PLAIN,
        Err(_) => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LocalNode;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_detect_known_headers() {
        let pdf = b"%PDF-1.7\n";
        assert_eq!(detect_mime_type(pdf), "application/pdf");

        let zip = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];
        assert_eq!(detect_mime_type(&zip), "application/zip");
    }

    #[test]
    fn test_detect_fallbacks() {
        assert_eq!(detect_mime_type(b""), TEXT_PLAIN);
        assert_eq!(detect_mime_type("héllo".as_bytes()), TEXT_PLAIN);
        // "é" cut after its first byte
        assert_eq!(detect_mime_type(&[b'h', 0xC3]), TEXT_PLAIN);
        assert_eq!(detect_mime_type(&[0x80, 0x81, 0x82, 0x83, 0x84]), OCTET_STREAM);
    }

    #[test]
    fn test_excluded_types_are_case_insensitive() {
        let check = SniffingContentType::excluding(["Application/Zip"]);
        assert!(!check.is_supported("application/zip"));
        assert!(!check.is_supported("APPLICATION/ZIP"));
        assert!(check.is_supported(TEXT_PLAIN));
        assert!(SniffingContentType::new().is_supported("application/zip"));
    }

    #[test]
    fn test_detect_reads_node() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("doc.pdf")).unwrap();
        std::fs::write(&path, b"%PDF-1.4 rest of document").unwrap();

        let check = SniffingContentType::new();
        assert_eq!(check.detect(&LocalNode::new(path)).unwrap(), "application/pdf");
    }
}
