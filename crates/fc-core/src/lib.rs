//! Core types, errors, and configuration for the fscrawl file repository crawler.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Config`] and its sections, loaded from JSON with defaults for every field
//! - [`ConfigError`] for consistent configuration error handling
//! - [`RootSpec`] / [`RootSpecs`] for normalized, deduplicated start paths
//! - [`HourWindow`] for schedule windows
//!
//! # Crate Dependencies
//!
//! ```text
//! fc-cli ──► fc-crawler ──► fc-walker ──► fc-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod root;

pub use config::{Config, CrawlConfig, FilterConfig, HourWindow, ScheduleConfig};
pub use error::ConfigError;
pub use root::{RootSpec, RootSpecs};
