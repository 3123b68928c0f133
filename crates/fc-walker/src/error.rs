//! Error types for the fc-walker crate.
//!
//! This module provides [`WalkError`] for failures while inspecting or
//! enumerating nodes, and [`ResolveError`] for failures while turning a root
//! path into a node.

use std::io;

/// Errors that can occur while walking a tree.
///
/// # Error Recovery Strategy
///
/// - **Listing errors** ([`WalkError::ListChildren`]): Recoverable - the
///   directory is treated as empty
/// - **Metadata / content errors**: Recoverable - the node is skipped
/// - **Pattern errors** ([`WalkError::Pattern`]): Fatal - the filter cannot be built
///
/// # Examples
///
/// ```
/// use fc_walker::WalkError;
/// use std::io;
///
/// let err = WalkError::list_children("/data/private", io::Error::from(io::ErrorKind::PermissionDenied));
/// assert!(err.is_recoverable());
/// assert_eq!(err.path(), Some("/data/private"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// A directory's children could not be enumerated.
    #[error("failed to list directory {path}: {source}")]
    ListChildren {
        /// The directory that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A node's metadata could not be read.
    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        /// The node that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A node's content could not be read for type detection.
    #[error("failed to read content of {path}: {source}")]
    Content {
        /// The node that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An include or exclude pattern is invalid.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] ignore::Error),
}

impl WalkError {
    /// Creates a new [`WalkError::ListChildren`] error.
    #[inline]
    pub fn list_children(path: impl Into<String>, source: io::Error) -> Self {
        Self::ListChildren {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`WalkError::Metadata`] error.
    #[inline]
    pub fn metadata(path: impl Into<String>, source: io::Error) -> Self {
        Self::Metadata {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`WalkError::Content`] error.
    #[inline]
    pub fn content(path: impl Into<String>, source: io::Error) -> Self {
        Self::Content {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the walk can continue past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Pattern(_))
    }

    /// Returns `true` if this error is fatal.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the node path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::ListChildren { path, .. }
            | Self::Metadata { path, .. }
            | Self::Content { path, .. } => Some(path),
            Self::Pattern(_) => None,
        }
    }
}

/// Errors that can occur while resolving a root path to a node.
///
/// None of these abort a crawl: a root that cannot be resolved is skipped
/// for the current pass.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The root does not exist.
    #[error("root does not exist: {0}")]
    NotFound(String),

    /// The root exists but cannot be read.
    #[error("access denied to root: {0}")]
    AccessDenied(String),

    /// No registered filesystem type handles the root.
    #[error("no filesystem type handles root: {0}")]
    UnknownFileSystem(String),

    /// An I/O error occurred while probing the root.
    #[error("failed to probe root {path}: {source}")]
    Io {
        /// The root path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    /// Returns the root path this error refers to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound(path)
            | Self::AccessDenied(path)
            | Self::UnknownFileSystem(path)
            | Self::Io { path, .. } => path,
        }
    }

    /// Returns `true` if the root is simply absent (not found or no backend).
    #[inline]
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UnknownFileSystem(_))
    }
}
