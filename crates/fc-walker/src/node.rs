//! Filesystem node abstraction and the local-disk backend.
//!
//! Every backend (local disk, Windows share, SMB, NFS) exposes its entries
//! through [`NodeHandle`]. The walker and the crawl task only ever see
//! `Box<dyn NodeHandle>`, never a concrete backend type.
//!
//! # Examples
//!
//! ```no_run
//! use fc_walker::{LocalNode, NodeHandle, NodeKind};
//!
//! let node = LocalNode::new("/srv/docs");
//! if node.kind()? == NodeKind::Directory {
//!     for child in node.list_children()? {
//!         println!("{}", child.path());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::error::WalkError;

/// An owned, type-erased node.
pub type Node = Box<dyn NodeHandle>;

/// The kind of entry a node refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// Anything else (symbolic links, devices, sockets, ...).
    Other,
}

/// Capability interface over a file or directory in some repository.
///
/// Handles are never mutated. Metadata accessors may perform I/O on every
/// call; callers that need a value twice should keep it.
///
/// # Thread Safety
///
/// Handles must be [`Send`] and [`Sync`] because walkers run on worker
/// threads of the crawl pool.
pub trait NodeHandle: Send + Sync + fmt::Debug {
    /// Full path (or URL) identifying the node.
    fn path(&self) -> &str;

    /// The kind of entry.
    fn kind(&self) -> io::Result<NodeKind>;

    /// Returns `true` if the node currently exists.
    fn exists(&self) -> io::Result<bool>;

    /// Returns `true` if the node can be read (opened or listed).
    fn can_read(&self) -> io::Result<bool>;

    /// Size in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Last modification time.
    fn modified(&self) -> io::Result<SystemTime>;

    /// Returns `true` if the repository marks this node hidden.
    fn is_hidden(&self) -> bool;

    /// Immediate children, sorted lexicographically by path.
    fn list_children(&self) -> Result<Vec<Node>, WalkError>;

    /// Opens the node's content for reading.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// A node on a locally mounted filesystem.
///
/// Symbolic links are reported as [`NodeKind::Other`] and never followed,
/// which rules out link cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNode {
    path: Utf8PathBuf,
}

impl LocalNode {
    /// Creates a handle for `path`. No I/O is performed.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The node path as a UTF-8 path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        &self.path
    }

    fn metadata(&self) -> io::Result<Metadata> {
        fs::symlink_metadata(&self.path)
    }
}

impl NodeHandle for LocalNode {
    fn path(&self) -> &str {
        self.path.as_str()
    }

    fn kind(&self) -> io::Result<NodeKind> {
        let file_type = self.metadata()?.file_type();
        Ok(if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_file() {
            NodeKind::File
        } else {
            NodeKind::Other
        })
    }

    fn exists(&self) -> io::Result<bool> {
        match self.metadata() {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn can_read(&self) -> io::Result<bool> {
        let probe = if self.metadata()?.is_dir() {
            fs::read_dir(&self.path).map(drop)
        } else {
            File::open(&self.path).map(drop)
        };
        match probe {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn modified(&self) -> io::Result<SystemTime> {
        self.metadata()?.modified()
    }

    fn is_hidden(&self) -> bool {
        self.path.file_name().is_some_and(|name| name.starts_with('.'))
    }

    fn list_children(&self) -> Result<Vec<Node>, WalkError> {
        let entries =
            fs::read_dir(&self.path).map_err(|e| WalkError::list_children(self.path.as_str(), e))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WalkError::list_children(self.path.as_str(), e))?;
            match Utf8PathBuf::from_path_buf(entry.path()) {
                Ok(path) => children.push(Self::new(path)),
                Err(path) => {
                    warn!(path = %path.display(), "Skipping non-UTF-8 path");
                }
            }
        }

        children.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        Ok(children
            .into_iter()
            .map(|child| Box::new(child) as Node)
            .collect())
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}
