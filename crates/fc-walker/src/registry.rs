//! Filesystem type registry and root resolution.
//!
//! A [`FileSystemType`] recognizes the paths it serves and resolves them to
//! root nodes. The [`FileSystemRegistry`] holds the registered types in
//! priority order; the first type that handles a path owns it.

use std::fmt;
use std::sync::Arc;

use fc_core::{RootSpec, RootSpecs};
use tracing::debug;

use crate::error::ResolveError;
use crate::node::{LocalNode, Node, NodeHandle};

/// A backend that can resolve root paths of one filesystem type.
pub trait FileSystemType: Send + Sync + fmt::Debug {
    /// Short, stable name of the type (e.g. `"local"`, `"smb"`).
    fn name(&self) -> &str;

    /// Returns `true` if this type serves `path`.
    fn handles(&self, path: &str) -> bool;

    /// Resolves `path` to a root node that exists and is readable.
    fn resolve(&self, path: &str) -> Result<Node, ResolveError>;
}

/// Locally mounted filesystems (including mounted NFS and SMB shares).
///
/// Handles every path that is not a URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Name under which local roots are registered.
    pub const NAME: &'static str = "local";
}

impl FileSystemType for LocalFileSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handles(&self, path: &str) -> bool {
        !path.contains("://")
    }

    fn resolve(&self, path: &str) -> Result<Node, ResolveError> {
        let node = LocalNode::new(path);
        let probe = |e| ResolveError::Io {
            path: path.to_owned(),
            source: e,
        };

        if !node.exists().map_err(probe)? {
            return Err(ResolveError::NotFound(path.to_owned()));
        }
        if !node.can_read().map_err(probe)? {
            return Err(ResolveError::AccessDenied(path.to_owned()));
        }
        Ok(Box::new(node))
    }
}

/// Ordered set of filesystem types.
///
/// # Examples
///
/// ```
/// use fc_walker::FileSystemRegistry;
///
/// let registry = FileSystemRegistry::default();
/// assert_eq!(registry.type_for("/srv/docs/").map(|t| t.name()), Some("local"));
/// assert!(registry.type_for("smb://host/share/").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemRegistry {
    types: Vec<Arc<dyn FileSystemType>>,
}

impl Default for FileSystemRegistry {
    /// A registry serving local paths only.
    fn default() -> Self {
        Self::empty().with_type(LocalFileSystem)
    }
}

impl FileSystemRegistry {
    /// Creates a registry with no types.
    #[must_use]
    pub fn empty() -> Self {
        Self { types: Vec::new() }
    }

    /// Registers a type ahead of all previously registered ones.
    #[must_use]
    pub fn with_type(mut self, fs_type: impl FileSystemType + 'static) -> Self {
        self.types.insert(0, Arc::new(fs_type));
        self
    }

    /// Returns the type that serves `path`, if any.
    #[must_use]
    pub fn type_for(&self, path: &str) -> Option<&dyn FileSystemType> {
        self.types
            .iter()
            .find(|t| t.handles(path))
            .map(|t| &**t)
    }

    /// Attaches filesystem type identity to every root that some type serves.
    ///
    /// Roots no type serves are kept without identity; resolving them later
    /// reports [`ResolveError::UnknownFileSystem`].
    #[must_use]
    pub fn identify(&self, roots: RootSpecs) -> RootSpecs {
        RootSpecs::from_roots(roots.into_iter().map(|root| {
            match self.type_for(root.path()).map(|t| t.name().to_owned()) {
                Some(name) => root.with_file_system(name),
                None => root,
            }
        }))
    }

    /// Resolves a root to its node.
    ///
    /// The root's recorded filesystem type is preferred; roots without one
    /// fall back to the first type that handles the path.
    pub fn resolve(&self, root: &RootSpec) -> Result<Node, ResolveError> {
        let fs_type = match root.file_system() {
            Some(name) => self.types.iter().find(|t| t.name() == name).map(|t| &**t),
            None => self.type_for(root.path()),
        }
        .ok_or_else(|| ResolveError::UnknownFileSystem(root.path().to_owned()))?;

        debug!(root = %root, file_system = fs_type.name(), "Resolving root");
        fs_type.resolve(root.path())
    }
}
