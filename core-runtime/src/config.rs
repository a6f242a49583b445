//! # Scanner Configuration Module
//!
//! Provides configuration management for the library scanner.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `ScannerConfig`
//! instance that holds the storage roots to scan, the folder filter policy and
//! the host capabilities the scanner depends on. It enforces fail-fast
//! validation so a missing capability is reported at startup, not in the
//! middle of a scan.
//!
//! ## Required Dependencies
//!
//! - `StorageAccess` - Directory listing over the configured roots
//!   (desktop default: tokio fs, with the `desktop-shims` feature)
//! - `KeyValueStore` - Persistence for groups, scan states and checksums
//!
//! ## Optional Dependencies
//!
//! - `Clock` - Time source for scan timestamps (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{FilterMode, ScannerConfig};
//! use std::sync::Arc;
//!
//! let config = ScannerConfig::builder()
//!     .library_root("/data/audiobooks", "Library")
//!     .external_path("/mnt/usb/Audiobooks")
//!     .filter_mode(FilterMode::Blacklist)
//!     .filter_patterns(["^\\.", "podcasts"])
//!     .store(Arc::new(MyStore))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::strip_path;
use bridge_traits::{Clock, KeyValueStore, StorageAccess, SystemClock};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Who owns a root's layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    /// Application-managed root with numeric collection folders
    LibraryManaged,
    /// User-chosen folder with an arbitrary layout
    External,
}

/// A configured top-level storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    /// Opaque location (path or document-tree URI)
    pub location: String,
    /// Display name used for root-level groups
    pub name: String,
    pub kind: RootKind,
}

impl ScanRoot {
    pub fn library(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            kind: RootKind::LibraryManaged,
        }
    }

    pub fn external(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            kind: RootKind::External,
        }
    }

    pub fn is_external(&self) -> bool {
        self.kind == RootKind::External
    }
}

/// Folder filter policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Exclude directories matching any pattern
    #[default]
    Blacklist,
    /// Exclude directories matching no pattern
    Whitelist,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Blacklist => "blacklist",
            FilterMode::Whitelist => "whitelist",
        }
    }
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blacklist" => Ok(FilterMode::Blacklist),
            "whitelist" => Ok(FilterMode::Whitelist),
            other => Err(Error::Config(format!(
                "Unknown filter mode '{}'. Expected 'blacklist' or 'whitelist'.",
                other
            ))),
        }
    }
}

/// Folder filter settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSettings {
    pub mode: FilterMode,
    /// Regular expressions or plain substrings
    pub patterns: Vec<String>,
}

/// Scanner configuration.
///
/// Use [`ScannerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ScannerConfig {
    /// Roots in configuration order
    pub roots: Vec<ScanRoot>,

    pub filter: FilterSettings,

    /// Descend into subdirectories (default: true)
    pub recursive: bool,

    /// Maintain the per-file checksum cache during scans (default: true)
    pub verify_checksums: bool,

    pub event_buffer_size: usize,

    pub storage: Arc<dyn StorageAccess>,

    pub store: Arc<dyn KeyValueStore>,

    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("roots", &self.roots)
            .field("filter", &self.filter)
            .field("recursive", &self.recursive)
            .field("verify_checksums", &self.verify_checksums)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("storage", &self.storage.backend().as_str())
            .field("store", &"KeyValueStore { ... }")
            .finish()
    }
}

impl ScannerConfig {
    /// Creates a new builder for constructing a `ScannerConfig`.
    pub fn builder() -> ScannerConfigBuilder {
        ScannerConfigBuilder::default()
    }

    /// The library-managed root, if one is configured
    pub fn library_root(&self) -> Option<&ScanRoot> {
        self.roots
            .iter()
            .find(|root| root.kind == RootKind::LibraryManaged)
    }

    pub fn external_roots(&self) -> impl Iterator<Item = &ScanRoot> {
        self.roots.iter().filter(|root| root.is_external())
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Root locations and names are not empty
    /// - No root is configured twice
    /// - At most one library-managed root exists
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut library_roots = 0;

        for root in &self.roots {
            if root.location.trim().is_empty() {
                return Err(Error::Config("Root location cannot be empty".to_string()));
            }
            if root.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Root '{}' has an empty name",
                    root.location
                )));
            }
            if !seen.insert(root.location.as_str()) {
                return Err(Error::Config(format!(
                    "Root '{}' is configured more than once",
                    root.location
                )));
            }
            if root.kind == RootKind::LibraryManaged {
                library_roots += 1;
            }
        }

        if library_roots > 1 {
            return Err(Error::Config(
                "At most one library-managed root can be configured".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn storage_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "StorageAccess".to_string(),
        message: "StorageAccess implementation is required to list library roots. \
                 Desktop: enable the 'desktop-shims' feature to use the default TokioFileSystem. \
                 Mobile: wrap the platform document tree in DocumentTreeStorage."
            .to_string(),
    }
}

fn store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "KeyValueStore implementation is required to persist groups and scan state. \
                 Desktop: inject bridge_desktop::SqliteKeyValueStore. \
                 Tests: inject InMemoryKeyValueStore."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_storage() -> Result<Arc<dyn StorageAccess>> {
    use bridge_desktop::TokioFileSystem;

    let storage: Arc<dyn StorageAccess> = Arc::new(TokioFileSystem::new());
    Ok(storage)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_storage() -> Result<Arc<dyn StorageAccess>> {
    Err(storage_missing_error())
}

/// Display name for a root given only its location
fn derive_root_name(location: &str) -> Option<String> {
    let trimmed = location.trim_end_matches(|c: char| c == '/' || c == '\\');
    let name = strip_path(trimmed);
    (!name.is_empty()).then(|| name.to_string())
}

/// Builder for constructing [`ScannerConfig`] instances.
pub struct ScannerConfigBuilder {
    roots: Vec<ScanRoot>,
    invalid_paths: Vec<String>,
    filter: FilterSettings,
    recursive: bool,
    verify_checksums: bool,
    event_buffer_size: usize,
    storage: Option<Arc<dyn StorageAccess>>,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for ScannerConfigBuilder {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            invalid_paths: Vec::new(),
            filter: FilterSettings::default(),
            recursive: true,
            verify_checksums: true,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            storage: None,
            store: None,
            clock: None,
        }
    }
}

impl ScannerConfigBuilder {
    /// Sets the library-managed root.
    ///
    /// Groups under this root are identified by numeric collection folders.
    pub fn library_root(mut self, location: impl Into<String>, name: impl Into<String>) -> Self {
        self.roots.push(ScanRoot::library(location, name));
        self
    }

    /// Adds an external root with an explicit display name.
    pub fn external_root(mut self, location: impl Into<String>, name: impl Into<String>) -> Self {
        self.roots.push(ScanRoot::external(location, name));
        self
    }

    /// Adds an external root named after its last path component.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::ScannerConfig;
    ///
    /// let builder = ScannerConfig::builder()
    ///     .external_path("/mnt/usb/Audiobooks");
    /// ```
    pub fn external_path(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        match derive_root_name(&location) {
            Some(name) => self.roots.push(ScanRoot::external(location, name)),
            None => self.invalid_paths.push(location),
        }
        self
    }

    /// Sets the folder filter mode.
    ///
    /// Default: blacklist
    pub fn filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter.mode = mode;
        self
    }

    /// Sets the folder filter patterns.
    pub fn filter_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Whether to descend into subdirectories.
    ///
    /// Default: true
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Whether to maintain the checksum cache while scanning.
    ///
    /// Default: true
    pub fn verify_checksums(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Sets the storage access implementation.
    ///
    /// If not provided, `TokioFileSystem` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn storage(mut self, storage: Arc<dyn StorageAccess>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the key-value store implementation (required).
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the clock implementation.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `ScannerConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ScannerConfig)` on success, or an error if:
    /// - A required capability is missing (StorageAccess, KeyValueStore)
    /// - A root path has no usable name
    /// - The configuration fails [`ScannerConfig::validate`]
    pub fn build(self) -> Result<ScannerConfig> {
        if let Some(path) = self.invalid_paths.first() {
            return Err(Error::Config(format!(
                "Cannot derive a root name from '{}'. Use .external_root() to name it.",
                path
            )));
        }

        let storage = match self.storage {
            Some(storage) => storage,
            None => provide_default_storage()?,
        };

        let store = self.store.ok_or_else(store_missing_error)?;

        let config = ScannerConfig {
            roots: self.roots,
            filter: self.filter,
            recursive: self.recursive,
            verify_checksums: self.verify_checksums,
            event_buffer_size: self.event_buffer_size,
            storage,
            store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::testing::MemoryStorage;
    use bridge_traits::InMemoryKeyValueStore;

    fn base() -> ScannerConfigBuilder {
        ScannerConfig::builder()
            .storage(Arc::new(MemoryStorage::new()))
            .store(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[test]
    fn test_builder_defaults() {
        let config = base().library_root("/lib", "Library").build().unwrap();

        assert!(config.recursive);
        assert!(config.verify_checksums);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.filter.mode, FilterMode::Blacklist);
        assert!(config.filter.patterns.is_empty());
        assert_eq!(config.library_root().unwrap().location, "/lib");
        assert_eq!(config.external_roots().count(), 0);
    }

    #[test]
    fn test_external_path_derives_name() {
        let config = base()
            .external_path("/mnt/usb/Audiobooks/")
            .external_path("content://tree/primary%3ABooks%2FKids")
            .build()
            .unwrap();

        let names: Vec<_> = config.external_roots().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Audiobooks", "Kids"]);
    }

    #[test]
    fn test_external_path_without_name_is_rejected() {
        let result = base().external_path("/").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_roots_rejected() {
        let result = base()
            .external_root("/books", "Books")
            .external_root("/books", "Again")
            .build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("more than once")));
    }

    #[test]
    fn test_second_library_root_rejected() {
        let result = base()
            .library_root("/lib", "Library")
            .library_root("/lib2", "Library 2")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let result = base().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_requires_store() {
        let result = ScannerConfig::builder()
            .storage(Arc::new(MemoryStorage::new()))
            .build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "KeyValueStore")
            }
            other => panic!("expected missing store, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_storage() {
        let result = ScannerConfig::builder()
            .store(Arc::new(InMemoryKeyValueStore::new()))
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "StorageAccess"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_default_storage() {
        let config = ScannerConfig::builder()
            .store(Arc::new(InMemoryKeyValueStore::new()))
            .build()
            .unwrap();
        assert_eq!(
            config.storage.backend(),
            bridge_traits::StorageBackend::FileSystem
        );
    }

    #[test]
    fn test_filter_settings() {
        let config = base()
            .filter_mode(FilterMode::Whitelist)
            .filter_patterns(vec!["Fantasy", "^Sci"])
            .recursive(false)
            .verify_checksums(false)
            .build()
            .unwrap();

        assert_eq!(config.filter.mode, FilterMode::Whitelist);
        assert_eq!(config.filter.patterns, vec!["Fantasy", "^Sci"]);
        assert!(!config.recursive);
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_filter_mode_from_str() {
        assert_eq!("Whitelist".parse::<FilterMode>().unwrap(), FilterMode::Whitelist);
        assert_eq!(" blacklist ".parse::<FilterMode>().unwrap(), FilterMode::Blacklist);
        assert!("greylist".parse::<FilterMode>().is_err());
        assert_eq!(FilterMode::Whitelist.as_str(), "whitelist");
    }

    #[test]
    fn test_config_debug_hides_capabilities() {
        let config = base().external_root("/books", "Books").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("memory"));
        assert!(debug.contains("KeyValueStore { ... }"));
    }
}
