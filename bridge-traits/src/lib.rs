//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the library scanner and the
//! platform-specific pieces it cannot own itself: how a storage root is
//! walked, where scan results are persisted, and what time it is.
//!
//! ## Traits
//!
//! ### Storage
//! - [`StorageAccess`](storage::StorageAccess) - Directory listing, metadata and reads over a storage root
//! - [`DocumentTreeHost`](document_tree::DocumentTreeHost) - Host document-tree API, adapted by
//!   [`DocumentTreeStorage`](document_tree::DocumentTreeStorage)
//!
//! ### Persistence
//! - [`KeyValueStore`](persistence::KeyValueStore) - Namespaced records for groups, scan states and checksums
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Storage | Persistence |
//! |----------|---------|-------------|
//! | Desktop  | `bridge-desktop::TokioFileSystem` | `bridge-desktop::SqliteKeyValueStore` |
//! | Mobile   | [`DocumentTreeStorage`](document_tree::DocumentTreeStorage) over a host adapter | host-provided |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Include the offending location in the error
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! across async tasks behind an `Arc`.

pub mod document_tree;
pub mod error;
pub mod persistence;
pub mod storage;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::BridgeError;

// Re-export commonly used types
pub use document_tree::{DocumentNode, DocumentTreeHost, DocumentTreeStorage};
pub use persistence::{InMemoryKeyValueStore, KeyValueStore};
pub use storage::{FileMetadata, StorageAccess, StorageBackend, StorageEntry};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
