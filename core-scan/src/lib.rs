//! # Library Scanning Module
//!
//! Discovers audiobooks beneath the configured roots and keeps the result
//! current with as little re-crawling as possible.
//!
//! ## Components
//!
//! - **Folder Filter** (`filter`): Blacklist/whitelist of directories by pattern
//! - **Directory Crawler** (`crawler`): Depth-first discovery of audio and cover files
//! - **Structure Classifier** (`classifier`): Sampling-based layout detection for external roots
//! - **Grouping Engine** (`grouping`, `cover`): Files to audiobook groups, with covers
//! - **Change Detection** (`checksum`, `scan_state`): File digests and per-root scan state
//! - **Orchestrator** (`orchestrator`): Incremental passes with full-rescan recovery

pub mod checksum;
pub mod classifier;
pub mod cover;
pub mod crawler;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod orchestrator;
pub mod paths;
pub mod scan_state;

pub use checksum::ChecksumService;
pub use classifier::StructureClassifier;
pub use crawler::{CrawlResult, DirectoryCrawler};
pub use error::{recovery_for, FailureSite, Recovery, Result, ScanError};
pub use filter::FolderFilter;
pub use orchestrator::{IncrementalScanner, ScanOutcome, ScanReport};
pub use scan_state::ScanStateTracker;
