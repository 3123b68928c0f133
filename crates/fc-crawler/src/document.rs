//! Materialized documents and the sink that consumes them.
//!
//! A crawl task turns every [`WalkItem`] the walker surfaces into a
//! [`Document`] and hands it to a [`DocumentSink`]. The sink decides what a
//! document becomes downstream; [`JsonLinesSink`] writes one JSON object per
//! line.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use fc_core::RootSpec;
use fc_walker::{WalkError, WalkItem};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::SinkError;
use crate::record::CrawlMode;

/// One document surfaced by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// The root the document was found under.
    pub root: String,
    /// Full path of the document.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, RFC 3339 in UTC.
    pub modified: String,
    /// Detected MIME type, if content was sniffed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Whether the repository marks the document hidden.
    pub hidden: bool,
    /// `"full"` or `"incremental"`.
    pub crawl_mode: &'static str,
}

impl Document {
    /// Reads the metadata of a walked node into a document.
    ///
    /// # Errors
    ///
    /// Returns a recoverable [`WalkError::Metadata`] if the node vanished or
    /// its metadata cannot be read.
    pub fn materialize(root: &RootSpec, item: WalkItem, mode: CrawlMode) -> Result<Self, WalkError> {
        let node = &item.node;
        let size = node
            .size()
            .map_err(|e| WalkError::metadata(node.path(), e))?;
        let modified = node
            .modified()
            .map_err(|e| WalkError::metadata(node.path(), e))?;

        Ok(Self {
            root: root.path().to_owned(),
            path: node.path().to_owned(),
            size,
            modified: DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Secs, true),
            content_type: item.content_type,
            hidden: node.is_hidden(),
            crawl_mode: mode.label(),
        })
    }
}

/// Downstream consumer of documents.
///
/// Sinks are shared by every crawl task of a scheduler and called from
/// worker threads concurrently.
pub trait DocumentSink: Send + Sync + fmt::Debug {
    /// Accepts one document.
    ///
    /// A [`SinkError::Recoverable`] skips the document; a
    /// [`SinkError::Fatal`] aborts the pass.
    fn accept(&self, document: Document) -> Result<(), SinkError>;

    /// Called once at the end of every pass over `root`, even aborted ones.
    fn flush(&self, root: &str) -> Result<(), SinkError>;

    /// Called once when the scheduler shuts down.
    fn cancel(&self);
}

/// Writes documents as newline-delimited JSON.
///
/// # Examples
///
/// ```
/// use fc_crawler::{DocumentSink, JsonLinesSink};
///
/// let sink = JsonLinesSink::new(Vec::new());
/// sink.flush("/srv/docs/").unwrap();
/// assert_eq!(sink.written(), 0);
/// assert!(sink.into_inner().is_empty());
/// ```
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
    written: AtomicU64,
    cancelled: AtomicBool,
}

impl<W> fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("written", &self.written())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wraps a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            written: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> JsonLinesSink<W> {
    /// Number of documents written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Returns `true` once [`DocumentSink::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<W: Write + Send> DocumentSink for JsonLinesSink<W> {
    fn accept(&self, document: Document) -> Result<(), SinkError> {
        if self.is_cancelled() {
            return Err(SinkError::fatal("sink cancelled"));
        }

        let line = serde_json::to_string(&document)
            .map_err(|e| SinkError::recoverable(document.path.as_str(), e.to_string()))?;

        let mut writer = self.writer.lock();
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| SinkError::fatal(format!("write failed: {e}")))?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self, root: &str) -> Result<(), SinkError> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| SinkError::fatal(format!("flush failed: {e}")))?;
        debug!(root, written = self.written(), "Flushed documents");
        Ok(())
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            info!(written = self.written(), "Document sink cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use fc_walker::LocalNode;
    use std::io;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn document(path: &str) -> Document {
        Document {
            root: "/r/".to_owned(),
            path: path.to_owned(),
            size: 3,
            modified: "2024-01-01T00:00:00Z".to_owned(),
            content_type: None,
            hidden: false,
            crawl_mode: "full",
        }
    }

    #[derive(Debug)]
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_materialize_local_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join(".notes")).unwrap();
        std::fs::write(&path, "hello").unwrap();

        let root = RootSpec::new(temp.path().to_str().unwrap()).unwrap();
        let item = WalkItem {
            node: Box::new(LocalNode::new(path.clone())),
            content_type: Some("text/plain".to_owned()),
        };
        let doc = Document::materialize(&root, item, CrawlMode::Incremental { since: UNIX_EPOCH })
            .unwrap();

        assert_eq!(doc.path, path.as_str());
        assert_eq!(doc.size, 5);
        assert!(doc.hidden);
        assert_eq!(doc.crawl_mode, "incremental");
        assert!(doc.modified.ends_with('Z'));
    }

    #[test]
    fn test_materialize_vanished_file() {
        let root = RootSpec::new("/r").unwrap();
        let item = WalkItem {
            node: Box::new(LocalNode::new("/definitely/gone")),
            content_type: None,
        };
        let err = Document::materialize(&root, item, CrawlMode::Full).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_json_lines_output() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.accept(document("/r/a")).unwrap();
        sink.accept(document("/r/b")).unwrap();
        sink.flush("/r/").unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["path"], "/r/a");
        assert_eq!(first["crawl_mode"], "full");
        assert!(first.get("content_type").is_none());
    }

    #[test]
    fn test_cancelled_sink_rejects_fatally() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.cancel();
        sink.cancel();
        assert!(sink.is_cancelled());
        assert!(sink.accept(document("/r/a")).unwrap_err().is_fatal());
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let sink = JsonLinesSink::new(BrokenWriter);
        assert!(sink.accept(document("/r/a")).unwrap_err().is_fatal());
        assert!(sink.flush("/r/").unwrap_err().is_fatal());
    }

    #[test]
    fn test_modified_formatting() {
        let modified = UNIX_EPOCH + Duration::from_secs(86_400);
        let formatted = DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Secs, true);
        assert_eq!(formatted, "1970-01-02T00:00:00Z");
    }
}
