//! Lazy depth-first tree walker.
//!
//! [`TreeWalker`] keeps a stack of traversal frames, one per directory being
//! expanded. Each frame is a consuming iterator over that directory's
//! children, listed once and sorted lexicographically, so advancing past a
//! node is O(1) and siblings are never reordered.
//!
//! The walker is pull-driven: [`TreeWalker::has_more`] performs whatever I/O
//! is needed to find the next qualifying document and parks it;
//! [`TreeWalker::take_next`] hands it out. A walker is spent once exhausted.
//!
//! Per-node failures never abort the walk. A directory that cannot be listed
//! is treated as empty; a node whose metadata or content cannot be read is
//! skipped. Both are logged and counted in [`WalkStats`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use fc_walker::{FileFilter, LocalNode, TreeWalker};
//!
//! let root = Box::new(LocalNode::new("/srv/docs/"));
//! let walker = TreeWalker::new(root, Arc::new(FileFilter::default()));
//! for item in walker {
//!     println!("{}", item.node.path());
//! }
//! ```

use std::iter::FusedIterator;
use std::sync::Arc;
use std::vec;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::filter::{FileFilter, Qualification};
use crate::node::{Node, NodeKind};
use crate::stats::WalkStats;

/// A qualifying document surfaced by the walker.
#[derive(Debug)]
pub struct WalkItem {
    /// The document's node.
    pub node: Node,
    /// MIME type detected during qualification, when a traversal context
    /// was configured.
    pub content_type: Option<String>,
}

/// Depth-first walker yielding qualifying documents under one root.
#[derive(Debug)]
pub struct TreeWalker {
    root_path: String,
    stack: Vec<vec::IntoIter<Node>>,
    filter: Arc<FileFilter>,
    pending: Option<WalkItem>,
    cancel: Option<CancellationToken>,
    stats: Arc<WalkStats>,
}

impl TreeWalker {
    /// Creates a walker seeded with a single frame containing `root`.
    ///
    /// No I/O happens until the first call to [`has_more`](Self::has_more).
    #[must_use]
    pub fn new(root: Node, filter: Arc<FileFilter>) -> Self {
        Self {
            root_path: root.path().to_owned(),
            stack: vec![vec![root].into_iter()],
            filter,
            pending: None,
            cancel: None,
            stats: Arc::new(WalkStats::new()),
        }
    }

    /// Stops the walk once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Records progress into shared counters.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<WalkStats>) -> Self {
        self.stats = stats;
        self
    }

    /// The counters this walker records into.
    #[must_use]
    pub fn stats(&self) -> &Arc<WalkStats> {
        &self.stats
    }

    /// Returns `true` if the cancellation token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Advances to the next qualifying document, if there is one.
    ///
    /// Calling this repeatedly without [`take_next`](Self::take_next) does
    /// not skip documents. Returns `false` once the tree is exhausted or the
    /// walk was cancelled.
    pub fn has_more(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }

        loop {
            if self.is_cancelled() {
                if !self.stack.is_empty() {
                    debug!(root = %self.root_path, "Walk cancelled");
                    self.stack.clear();
                }
                return false;
            }

            let Some(frame) = self.stack.last_mut() else {
                return false;
            };
            let Some(node) = frame.next() else {
                self.stack.pop();
                continue;
            };

            if let Some(item) = self.visit(node) {
                self.pending = Some(item);
                return true;
            }
        }
    }

    /// Takes the document found by the last positive
    /// [`has_more`](Self::has_more).
    ///
    /// Returns `None` if there is no parked document.
    pub fn take_next(&mut self) -> Option<WalkItem> {
        self.pending.take()
    }

    fn visit(&mut self, node: Node) -> Option<WalkItem> {
        let kind = match node.kind() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(path = node.path(), error = %e, "Skipping node with unreadable metadata");
                self.stats.increment_node_errors();
                return None;
            }
        };
        let relative = self.relative(node.path());

        if kind == NodeKind::Directory {
            if !self.filter.accepts_directory(&relative) {
                debug!(path = node.path(), "Pruning excluded directory");
                self.stats.increment_pruned();
                return None;
            }
            self.stats.increment_directories();
            let children = node.list_children().unwrap_or_else(|e| {
                warn!(path = node.path(), error = %e, "Treating unlistable directory as empty");
                self.stats.increment_listing_errors();
                Vec::new()
            });
            self.stack.push(children.into_iter());
            return None;
        }

        match self.filter.qualify(node.as_ref(), kind, &relative) {
            Ok(Qualification::Accepted { content_type }) => {
                self.stats.increment_surfaced();
                Some(WalkItem { node, content_type })
            }
            Ok(Qualification::Rejected(reason)) => {
                trace!(path = node.path(), reason = reason.label(), "Node rejected");
                self.stats.increment_filtered();
                None
            }
            Err(e) => {
                warn!(path = node.path(), error = %e, "Skipping node");
                self.stats.increment_node_errors();
                None
            }
        }
    }

    /// Path of `path` relative to the walk root, with `/` separators.
    fn relative(&self, path: &str) -> String {
        let relative = path
            .strip_prefix(self.root_path.as_str())
            .unwrap_or(path)
            .trim_start_matches(['/', '\\']);
        relative.replace('\\', "/")
    }
}

impl Iterator for TreeWalker {
    type Item = WalkItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_more() {
            self.take_next()
        } else {
            None
        }
    }
}

impl FusedIterator for TreeWalker {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SniffingContentType;
    use crate::error::WalkError;
    use crate::filter::{PatternMatcher, TraversalContext};
    use crate::node::{LocalNode, NodeHandle};
    use camino::{Utf8Path, Utf8PathBuf};
    use std::fs;
    use std::io::{self, Read};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    /// In-memory node for failure injection.
    #[derive(Debug, Clone)]
    struct FakeNode {
        path: String,
        kind: NodeKind,
        children: Option<Vec<FakeNode>>,
        modified: SystemTime,
    }

    impl FakeNode {
        fn file(path: &str) -> Self {
            Self {
                path: path.to_owned(),
                kind: NodeKind::File,
                children: None,
                modified: UNIX_EPOCH + Duration::from_secs(1_000),
            }
        }

        fn dir(path: &str, children: Vec<FakeNode>) -> Self {
            Self {
                path: path.to_owned(),
                kind: NodeKind::Directory,
                children: Some(children),
                modified: UNIX_EPOCH,
            }
        }

        fn unlistable(path: &str) -> Self {
            Self {
                path: path.to_owned(),
                kind: NodeKind::Directory,
                children: None,
                modified: UNIX_EPOCH,
            }
        }
    }

    impl NodeHandle for FakeNode {
        fn path(&self) -> &str {
            &self.path
        }

        fn kind(&self) -> io::Result<NodeKind> {
            Ok(self.kind)
        }

        fn exists(&self) -> io::Result<bool> {
            Ok(true)
        }

        fn can_read(&self) -> io::Result<bool> {
            Ok(true)
        }

        fn size(&self) -> io::Result<u64> {
            Ok(1)
        }

        fn modified(&self) -> io::Result<SystemTime> {
            Ok(self.modified)
        }

        fn is_hidden(&self) -> bool {
            false
        }

        fn list_children(&self) -> Result<Vec<Node>, WalkError> {
            match &self.children {
                Some(children) => Ok(children
                    .iter()
                    .cloned()
                    .map(|c| Box::new(c) as Node)
                    .collect()),
                None => Err(WalkError::list_children(
                    self.path.as_str(),
                    io::Error::from(io::ErrorKind::PermissionDenied),
                )),
            }
        }

        fn open(&self) -> io::Result<Box<dyn Read + Send>> {
            Ok(Box::new(io::Cursor::new(b"x".to_vec())))
        }
    }

    fn paths(walker: TreeWalker) -> Vec<String> {
        walker.map(|item| item.node.path().to_owned()).collect()
    }

    fn utf8(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    fn walk_local(root: &Utf8Path, filter: FileFilter) -> Vec<String> {
        let walker = TreeWalker::new(Box::new(LocalNode::new(root)), Arc::new(filter));
        walker
            .map(|item| {
                item.node
                    .path()
                    .strip_prefix(root.as_str())
                    .unwrap_or_default()
                    .trim_start_matches('/')
                    .to_owned()
            })
            .collect()
    }

    #[test]
    fn test_files_and_empty_directory() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(root.join("f2"), "two").unwrap();
        fs::write(root.join("f1"), "one").unwrap();
        fs::create_dir(root.join("d1")).unwrap();

        let filter = FileFilter::new(PatternMatcher::new(&["*"], &[]).unwrap());
        assert_eq!(walk_local(&root, filter), vec!["f1", "f2"]);
    }

    #[test]
    fn test_size_limit_excludes_sibling() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(root.join("fTooBig"), [b'a'; 100]).unwrap();
        fs::write(root.join("fOk"), "fine").unwrap();

        let filter = FileFilter::default()
            .with_context(TraversalContext::new(10, Arc::new(SniffingContentType::new())));
        let walker = TreeWalker::new(Box::new(LocalNode::new(&root)), Arc::new(filter));
        let items: Vec<WalkItem> = walker.collect();

        assert_eq!(items.len(), 1);
        assert!(items[0].node.path().ends_with("fOk"));
        assert_eq!(items[0].content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_excluded_directory_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::create_dir_all(root.join("skip/inner")).unwrap();
        fs::write(root.join("keep/a.txt"), "a").unwrap();
        fs::write(root.join("skip/b.txt"), "b").unwrap();
        fs::write(root.join("skip/inner/c.txt"), "c").unwrap();
        fs::write(root.join("keep/d.bin"), "d").unwrap();

        let filter = FileFilter::new(PatternMatcher::new(&["*.txt"], &["skip"]).unwrap());
        assert_eq!(walk_local(&root, filter), vec!["keep/a.txt"]);
    }

    #[test]
    fn test_depth_first_lexicographic_order() {
        let root = FakeNode::dir(
            "/r",
            vec![
                FakeNode::dir("/r/a", vec![FakeNode::file("/r/a/y"), FakeNode::file("/r/a/z")]),
                FakeNode::file("/r/b"),
                FakeNode::dir("/r/c", vec![FakeNode::file("/r/c/x")]),
            ],
        );
        let walker = TreeWalker::new(Box::new(root), Arc::new(FileFilter::default()));
        assert_eq!(paths(walker), vec!["/r/a/y", "/r/a/z", "/r/b", "/r/c/x"]);
    }

    #[test]
    fn test_listing_failure_does_not_abort_walk() {
        let root = FakeNode::dir(
            "/r",
            vec![
                FakeNode::unlistable("/r/a"),
                FakeNode::dir("/r/b", vec![FakeNode::file("/r/b/x")]),
                FakeNode::file("/r/c"),
            ],
        );
        let stats = Arc::new(WalkStats::new());
        let walker = TreeWalker::new(Box::new(root), Arc::new(FileFilter::default()))
            .with_stats(Arc::clone(&stats));

        assert_eq!(paths(walker), vec!["/r/b/x", "/r/c"]);
        let snap = stats.snapshot();
        assert_eq!(snap.listing_errors, 1);
        assert_eq!(snap.surfaced, 2);
        assert_eq!(snap.directories, 3);
    }

    #[test]
    fn test_unlistable_root_yields_nothing() {
        let walker = TreeWalker::new(
            Box::new(FakeNode::unlistable("/r")),
            Arc::new(FileFilter::default()),
        );
        assert!(paths(walker).is_empty());
    }

    #[test]
    fn test_modified_since_filters_old_nodes() {
        let root = FakeNode::dir("/r", vec![FakeNode::file("/r/old")]);
        let filter = FileFilter::default()
            .with_modified_since(Some(UNIX_EPOCH + Duration::from_secs(2_000)));
        let walker = TreeWalker::new(Box::new(root.clone()), Arc::new(filter));
        assert!(paths(walker).is_empty());

        let filter = FileFilter::default().with_modified_since(Some(UNIX_EPOCH));
        let walker = TreeWalker::new(Box::new(root), Arc::new(filter));
        assert_eq!(paths(walker), vec!["/r/old"]);
    }

    #[test]
    fn test_walk_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::create_dir_all(root.join("b/c")).unwrap();
        for name in ["a", "b/x", "b/c/y", "z"] {
            fs::write(root.join(name), name).unwrap();
        }

        let first = walk_local(&root, FileFilter::default());
        let second = walk_local(&root, FileFilter::default());
        assert_eq!(first, vec!["a", "b/c/y", "b/x", "z"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_has_more_is_idempotent_until_taken() {
        let root = FakeNode::dir("/r", vec![FakeNode::file("/r/a"), FakeNode::file("/r/b")]);
        let mut walker = TreeWalker::new(Box::new(root), Arc::new(FileFilter::default()));

        assert!(walker.take_next().is_none());
        assert!(walker.has_more());
        assert!(walker.has_more());
        assert_eq!(walker.take_next().unwrap().node.path(), "/r/a");
        assert!(walker.take_next().is_none());
        assert!(walker.has_more());
        assert_eq!(walker.take_next().unwrap().node.path(), "/r/b");
        assert!(!walker.has_more());
        assert!(!walker.has_more());
    }

    #[test]
    fn test_cancellation_stops_walk() {
        let root = FakeNode::dir(
            "/r",
            vec![FakeNode::file("/r/a"), FakeNode::file("/r/b"), FakeNode::file("/r/c")],
        );
        let token = CancellationToken::new();
        let mut walker = TreeWalker::new(Box::new(root), Arc::new(FileFilter::default()))
            .with_cancellation(token.clone());

        assert_eq!(walker.next().unwrap().node.path(), "/r/a");
        token.cancel();
        assert!(walker.is_cancelled());
        assert!(walker.next().is_none());
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_relative_paths() {
        let walker = TreeWalker::new(
            Box::new(FakeNode::dir("/srv/docs/", Vec::new())),
            Arc::new(FileFilter::default()),
        );
        assert_eq!(walker.relative("/srv/docs/"), "");
        assert_eq!(walker.relative("/srv/docs/a/b.txt"), "a/b.txt");

        let unc = TreeWalker::new(
            Box::new(FakeNode::dir(r"\\host\share\", Vec::new())),
            Arc::new(FileFilter::default()),
        );
        assert_eq!(unc.relative(r"\\host\share\dir\f.txt"), "dir/f.txt");
    }
}
