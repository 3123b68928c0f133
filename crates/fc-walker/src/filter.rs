//! The filter bundle deciding which nodes qualify as documents.
//!
//! - [`PatternMatcher`] - include/exclude globs over root-relative paths
//! - [`TraversalContext`] - maximum size and content type checks
//! - [`FileFilter`] - the full qualification chain, including the
//!   modification-time threshold of incremental passes
//!
//! Qualification short-circuits in a fixed order so the cheap checks run
//! before anything touches file content:
//!
//! ```text
//! regular file → pattern → readable → modified since → size → content type
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use fc_core::FilterConfig;
use ignore::overrides::{Override, OverrideBuilder};

use crate::content::{ContentTypeCheck, SniffingContentType};
use crate::error::WalkError;
use crate::node::{NodeHandle, NodeKind};

/// Include/exclude glob matcher.
///
/// Globs use gitignore syntax and are matched against paths relative to the
/// walk root. Exclusions win over inclusions. Include globs only reject
/// files: a directory is pruned solely by an exclude glob, so `*.pdf` still
/// finds PDFs in subdirectories.
///
/// # Examples
///
/// ```
/// use fc_walker::PatternMatcher;
///
/// let matcher = PatternMatcher::new(&["*.pdf"], &["drafts/"]).unwrap();
/// assert!(matcher.accepts("reports/q1.pdf", false));
/// assert!(!matcher.accepts("reports/q1.txt", false));
/// assert!(matcher.accepts("reports", true));
/// assert!(!matcher.accepts("drafts", true));
/// ```
#[derive(Clone)]
pub struct PatternMatcher {
    globs: Override,
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("globs", &(self.globs.num_ignores() + self.globs.num_whitelists()))
            .finish()
    }
}

impl PatternMatcher {
    /// Builds a matcher from include and exclude globs.
    ///
    /// An empty include list accepts every file not excluded.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Pattern`] if any glob is malformed.
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self, WalkError> {
        let mut builder = OverrideBuilder::new(".");
        for include in includes {
            builder.add(include.as_ref())?;
        }
        // Later globs take precedence, so excludes go last.
        for exclude in excludes {
            builder.add(&format!("!{}", exclude.as_ref()))?;
        }
        Ok(Self {
            globs: builder.build()?,
        })
    }

    /// A matcher that accepts everything.
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            globs: Override::empty(),
        }
    }

    /// Returns `true` if the root-relative path is accepted.
    ///
    /// The empty path (the walk root itself) is always accepted.
    #[must_use]
    pub fn accepts(&self, relative: &str, is_dir: bool) -> bool {
        relative.is_empty() || !self.globs.matched(relative, is_dir).is_ignore()
    }
}

/// Size and content type limits applied to candidate documents.
#[derive(Debug, Clone)]
pub struct TraversalContext {
    max_document_size: u64,
    content_check: Arc<dyn ContentTypeCheck>,
}

impl TraversalContext {
    /// Creates a context with the given limits.
    #[must_use]
    pub fn new(max_document_size: u64, content_check: Arc<dyn ContentTypeCheck>) -> Self {
        Self {
            max_document_size,
            content_check,
        }
    }

    /// Largest accepted document size in bytes.
    #[inline]
    #[must_use]
    pub const fn max_document_size(&self) -> u64 {
        self.max_document_size
    }

    /// The content type check.
    #[must_use]
    pub fn content_check(&self) -> &dyn ContentTypeCheck {
        self.content_check.as_ref()
    }
}

/// Why a node failed to qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Not a regular file.
    NotAFile,
    /// Rejected by the include/exclude globs.
    Pattern,
    /// Not readable.
    Unreadable,
    /// Unchanged since the incremental threshold.
    Unmodified,
    /// Larger than the maximum document size.
    TooLarge,
    /// Content type is not supported.
    UnsupportedType,
}

impl Rejection {
    /// Short label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotAFile => "not a file",
            Self::Pattern => "pattern",
            Self::Unreadable => "unreadable",
            Self::Unmodified => "unmodified",
            Self::TooLarge => "too large",
            Self::UnsupportedType => "unsupported type",
        }
    }
}

/// Outcome of qualifying one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualification {
    /// The node is a document; carries the detected content type when a
    /// traversal context was supplied.
    Accepted {
        /// Detected MIME type.
        content_type: Option<String>,
    },
    /// The node is skipped.
    Rejected(Rejection),
}

/// The complete filter bundle for one walk.
///
/// # Examples
///
/// ```
/// use fc_core::FilterConfig;
/// use fc_walker::FileFilter;
///
/// let filter = FileFilter::from_config(&FilterConfig::default()).unwrap();
/// assert!(filter.context().is_some());
/// assert!(filter.modified_since().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FileFilter {
    patterns: PatternMatcher,
    context: Option<TraversalContext>,
    modified_since: Option<SystemTime>,
}

impl Default for FileFilter {
    /// Accepts every readable regular file.
    fn default() -> Self {
        Self::new(PatternMatcher::accept_all())
    }
}

impl FileFilter {
    /// Creates a filter with only pattern matching.
    #[must_use]
    pub fn new(patterns: PatternMatcher) -> Self {
        Self {
            patterns,
            context: None,
            modified_since: None,
        }
    }

    /// Builds a filter from configuration, sniffing content types when a
    /// maximum document size is configured.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Pattern`] if any configured glob is malformed.
    pub fn from_config(config: &FilterConfig) -> Result<Self, WalkError> {
        let patterns = PatternMatcher::new(
            config.include_patterns.as_slice(),
            config.exclude_patterns.as_slice(),
        )?;
        let context = config.max_document_size.map(|max| {
            TraversalContext::new(
                max,
                Arc::new(SniffingContentType::excluding(&config.excluded_mime_types)),
            )
        });
        Ok(Self {
            patterns,
            context,
            modified_since: None,
        })
    }

    /// Sets the size and content type limits.
    #[must_use]
    pub fn with_context(mut self, context: TraversalContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Restricts qualification to nodes modified at or after `threshold`.
    #[must_use]
    pub fn with_modified_since(mut self, threshold: Option<SystemTime>) -> Self {
        self.modified_since = threshold;
        self
    }

    /// The pattern matcher.
    #[must_use]
    pub fn patterns(&self) -> &PatternMatcher {
        &self.patterns
    }

    /// The size/type context, if any.
    #[must_use]
    pub fn context(&self) -> Option<&TraversalContext> {
        self.context.as_ref()
    }

    /// The incremental threshold, if any.
    #[must_use]
    pub fn modified_since(&self) -> Option<SystemTime> {
        self.modified_since
    }

    /// Returns `true` if a directory should be expanded.
    #[must_use]
    pub fn accepts_directory(&self, relative: &str) -> bool {
        self.patterns.accepts(relative, true)
    }

    /// Runs the qualification chain for a non-directory node.
    ///
    /// # Errors
    ///
    /// Returns a recoverable [`WalkError`] when metadata or content cannot be
    /// read; the caller skips the node.
    pub fn qualify(
        &self,
        node: &dyn NodeHandle,
        kind: NodeKind,
        relative: &str,
    ) -> Result<Qualification, WalkError> {
        use Qualification::Rejected;

        if kind != NodeKind::File {
            return Ok(Rejected(Rejection::NotAFile));
        }
        if !self.patterns.accepts(relative, false) {
            return Ok(Rejected(Rejection::Pattern));
        }
        let readable = node
            .can_read()
            .map_err(|e| WalkError::metadata(node.path(), e))?;
        if !readable {
            return Ok(Rejected(Rejection::Unreadable));
        }
        if let Some(threshold) = self.modified_since {
            let modified = node
                .modified()
                .map_err(|e| WalkError::metadata(node.path(), e))?;
            if modified < threshold {
                return Ok(Rejected(Rejection::Unmodified));
            }
        }

        let Some(context) = &self.context else {
            return Ok(Qualification::Accepted { content_type: None });
        };
        let size = node
            .size()
            .map_err(|e| WalkError::metadata(node.path(), e))?;
        if size > context.max_document_size {
            return Ok(Rejected(Rejection::TooLarge));
        }
        let content_type = context
            .content_check
            .detect(node)
            .map_err(|e| WalkError::content(node.path(), e))?;
        if !context.content_check.is_supported(&content_type) {
            return Ok(Rejected(Rejection::UnsupportedType));
        }
        Ok(Qualification::Accepted {
            content_type: Some(content_type),
        })
    }
}
