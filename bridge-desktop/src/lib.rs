//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `StorageAccess` using `tokio::fs` over plain paths
//! - `KeyValueStore` using a SQLite table shared by all namespaces
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{SqliteKeyValueStore, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = TokioFileSystem::new();
//!     let store = SqliteKeyValueStore::new(SqliteKeyValueStore::default_location())
//!         .await
//!         .unwrap();
//!
//!     // Use in core configuration
//! }
//! ```

mod filesystem;
mod key_value;

pub use filesystem::TokioFileSystem;
pub use key_value::SqliteKeyValueStore;
