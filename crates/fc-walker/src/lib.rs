//! Filtered depth-first traversal over pluggable filesystem backends.
//!
//! # Overview
//!
//! - [`NodeHandle`]: capability interface every backend implements
//! - [`FileSystemRegistry`]: resolves root paths to nodes (the path resolver)
//! - [`FileFilter`]: patterns, size limit, content type and modification time
//! - [`TreeWalker`]: lazy, lexicographic depth-first walk yielding documents
//! - [`WalkStats`]: atomic counters shared across concurrent walks
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fc_core::{FilterConfig, RootSpec};
//! use fc_walker::{FileFilter, FileSystemRegistry, TreeWalker};
//!
//! let registry = FileSystemRegistry::default();
//! let root = registry.resolve(&RootSpec::new("/srv/docs")?)?;
//! let filter = Arc::new(FileFilter::from_config(&FilterConfig::default())?);
//!
//! let mut walker = TreeWalker::new(root, filter);
//! while walker.has_more() {
//!     if let Some(item) = walker.take_next() {
//!         println!("{} ({:?})", item.node.path(), item.content_type);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! FileSystemRegistry ──resolve──► Node (root)
//!                                   │
//! TreeWalker ◄──────────────────────┘
//!     ├── frame stack: Vec<vec::IntoIter<Node>>
//!     ├── FileFilter
//!     │       ├── PatternMatcher (ignore overrides)
//!     │       └── TraversalContext (size, ContentTypeCheck via infer)
//!     └── WalkStats
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod content;
pub mod error;
pub mod filter;
pub mod node;
pub mod registry;
pub mod stats;
pub mod walker;

pub use content::{ContentTypeCheck, SniffingContentType};
pub use error::{ResolveError, WalkError};
pub use filter::{FileFilter, PatternMatcher, Qualification, Rejection, TraversalContext};
pub use node::{LocalNode, Node, NodeHandle, NodeKind};
pub use registry::{FileSystemRegistry, FileSystemType, LocalFileSystem};
pub use stats::{WalkSnapshot, WalkStats};
pub use walker::{TreeWalker, WalkItem};
