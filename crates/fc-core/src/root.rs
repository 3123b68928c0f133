//! Normalized start paths.
//!
//! A [`RootSpec`] is one configured top-level path to be crawled. Paths are
//! opaque strings (local paths, UNC paths, `smb://` URLs, ...) normalized to
//! end with their separator so that prefix matching never confuses `/data`
//! with `/database`.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::ConfigError;

/// One configured start path plus the filesystem type that serves it.
///
/// # Examples
///
/// ```
/// use fc_core::RootSpec;
///
/// let root = RootSpec::new("/srv/docs").unwrap();
/// assert_eq!(root.path(), "/srv/docs/");
///
/// let unc = RootSpec::new(r"\\server\share").unwrap();
/// assert_eq!(unc.path(), r"\\server\share\");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootSpec {
    path: String,
    file_system: Option<String>,
}

impl RootSpec {
    /// Creates a root spec, normalizing the path to its trailing-separator form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] if the path is blank.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::invalid_path(path, "path is empty"));
        }

        let separator = separator_for(trimmed);
        let mut normalized = trimmed.to_owned();
        if !normalized.ends_with(separator) {
            normalized.push(separator);
        }

        Ok(Self {
            path: normalized,
            file_system: None,
        })
    }

    /// Attaches the name of the filesystem type that resolves this root.
    #[must_use]
    pub fn with_file_system(mut self, name: impl Into<String>) -> Self {
        self.file_system = Some(name.into());
        self
    }

    /// The normalized path, always ending in a separator.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The filesystem type name, if one has been resolved.
    #[inline]
    #[must_use]
    pub fn file_system(&self) -> Option<&str> {
        self.file_system.as_deref()
    }

    /// Returns `true` if `path` lies at or below this root.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        path.starts_with(&self.path) || self.path.strip_suffix(separator_for(&self.path)) == Some(path)
    }
}

impl fmt::Display for RootSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Picks `\` for Windows-style paths that never use `/`, and `/` otherwise.
fn separator_for(path: &str) -> char {
    if path.contains('\\') && !path.contains('/') {
        '\\'
    } else {
        '/'
    }
}

/// A deduplicated set of root specs in configuration order.
///
/// # Examples
///
/// ```
/// use fc_core::RootSpecs;
///
/// let roots = RootSpecs::from_paths(&["/data", "/data/", "/data/archive"]).unwrap();
/// assert_eq!(roots.len(), 2);
///
/// let owner = roots.find_root("/data/archive/2020/report.pdf").unwrap();
/// assert_eq!(owner.path(), "/data/archive/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSpecs {
    roots: Vec<RootSpec>,
}

impl RootSpecs {
    /// Normalizes and deduplicates a list of start paths.
    ///
    /// The first occurrence of each normalized path wins; order is otherwise
    /// preserved.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self, ConfigError> {
        let mut seen = FxHashSet::default();
        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            let root = RootSpec::new(path.as_ref())?;
            if seen.insert(root.path.clone()) {
                roots.push(root);
            }
        }
        Ok(Self { roots })
    }

    /// Creates a set from already-built roots, dropping duplicate paths.
    #[must_use]
    pub fn from_roots(roots: impl IntoIterator<Item = RootSpec>) -> Self {
        let mut seen = FxHashSet::default();
        let roots = roots
            .into_iter()
            .filter(|root| seen.insert(root.path.clone()))
            .collect();
        Self { roots }
    }

    /// Number of distinct roots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if no roots are configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Iterates roots in configuration order.
    pub fn iter(&self) -> std::slice::Iter<'_, RootSpec> {
        self.roots.iter()
    }

    /// Returns the roots ordered by decreasing path length.
    #[must_use]
    pub fn longest_prefix_order(&self) -> Vec<&RootSpec> {
        let mut ordered: Vec<&RootSpec> = self.roots.iter().collect();
        ordered.sort_by(|a, b| b.path.len().cmp(&a.path.len()).then_with(|| a.path.cmp(&b.path)));
        ordered
    }

    /// Finds the most specific root containing `path`.
    #[must_use]
    pub fn find_root(&self, path: &str) -> Option<&RootSpec> {
        self.longest_prefix_order()
            .into_iter()
            .find(|root| root.contains(path))
    }
}

impl IntoIterator for RootSpecs {
    type Item = RootSpec;
    type IntoIter = std::vec::IntoIter<RootSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.into_iter()
    }
}

impl<'a> IntoIterator for &'a RootSpecs {
    type Item = &'a RootSpec;
    type IntoIter = std::slice::Iter<'a, RootSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.iter()
    }
}
