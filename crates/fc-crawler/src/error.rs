//! Error types for the fc-crawler crate.
//!
//! [`SinkError`] is what a [`DocumentSink`](crate::DocumentSink) reports for
//! one document; [`CrawlError`] is what escapes a crawl task or the scheduler.

/// Failure reported by a document sink.
///
/// # Examples
///
/// ```
/// use fc_crawler::SinkError;
///
/// let err = SinkError::recoverable("/srv/docs/a.pdf", "rejected by consumer");
/// assert!(err.is_recoverable());
/// assert!(SinkError::fatal("consumer gone").is_fatal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// One document was rejected; the pass continues.
    #[error("document {path} rejected: {reason}")]
    Recoverable {
        /// The rejected document.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The sink cannot accept anything further this pass.
    #[error("document sink failed: {0}")]
    Fatal(String),
}

impl SinkError {
    /// Creates a new [`SinkError::Recoverable`] error.
    #[inline]
    pub fn recoverable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Recoverable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`SinkError::Fatal`] error.
    #[inline]
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }

    /// Returns `true` if the pass can continue past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }

    /// Returns `true` if this error aborts the pass.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// Errors that escape a crawl task or the scheduler.
///
/// # Error Recovery Strategy
///
/// - **Sink / repository errors**: abort one root's pass; the scheduler backs
///   off for the error delay and retries every root on the next tick
/// - **Cancelled**: the pass was interrupted by shutdown or a schedule change;
///   not counted as a failure
/// - **Pool / lifecycle errors**: fatal to the scheduler
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The document sink failed fatally.
    #[error(transparent)]
    Sink(SinkError),

    /// A repository-level failure outside per-node handling.
    #[error("repository failure under {root}: {source}")]
    Repository {
        /// The root being crawled.
        root: String,
        /// The underlying error.
        #[source]
        source: fc_walker::ResolveError,
    },

    /// The pass was cancelled before it finished.
    #[error("crawl cancelled")]
    Cancelled,

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// `start` was called on a scheduler that is not idle.
    #[error("scheduler already started")]
    AlreadyStarted,
}

impl CrawlError {
    /// Creates a new [`CrawlError::Repository`] error.
    #[inline]
    pub fn repository(root: impl Into<String>, source: fc_walker::ResolveError) -> Self {
        Self::Repository {
            root: root.into(),
            source,
        }
    }

    /// Returns `true` if this error came from cancellation.
    #[inline]
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the scheduler can keep ticking after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Sink(_) | Self::Repository { .. } | Self::Cancelled)
    }

    /// Returns `true` if this error stops the scheduler.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl From<SinkError> for CrawlError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_walker::ResolveError;

    #[test]
    fn test_sink_error_classification() {
        let err = SinkError::recoverable("/a", "bad");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "document /a rejected: bad");

        let err = SinkError::fatal("closed");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "document sink failed: closed");
    }

    #[test]
    fn test_crawl_error_classification() {
        let err = CrawlError::from(SinkError::fatal("closed"));
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "document sink failed: closed");

        let err = CrawlError::repository(
            "/srv/",
            ResolveError::AccessDenied("/srv/".to_owned()),
        );
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("/srv/"));

        assert!(CrawlError::Cancelled.is_cancelled());
        assert!(CrawlError::AlreadyStarted.is_fatal());
    }
}
