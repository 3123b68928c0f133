//! Error types for the fc-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration-related errors
//! that can occur across the workspace.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// This error type covers all configuration-related failures including
/// start path normalization, option validation, schedule windows, and parsing.
///
/// # Examples
///
/// ```
/// use fc_core::ConfigError;
///
/// let error = ConfigError::invalid_path("", "path is empty");
/// assert!(error.to_string().contains("path is empty"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided start path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: String,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// No start paths were configured.
    #[error("no start paths configured")]
    MissingStartPaths,

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// A schedule window could not be parsed.
    #[error("invalid schedule window '{window}': {reason}")]
    InvalidSchedule {
        /// The window text as configured.
        window: String,
        /// Explanation of why the window is invalid.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidPath`] error.
    #[inline]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ConfigError::InvalidSchedule`] error.
    #[inline]
    pub fn invalid_schedule(window: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            window: window.into(),
            reason: reason.into(),
        }
    }
}
