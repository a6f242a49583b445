//! Domain models for the audiobook library
//!
//! Groups are keyed by their location string. That key is the only identity
//! that survives a rescan, in memory and in the store alike.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::ordering::compare_segments;

// =============================================================================
// Discovered Entries
// =============================================================================

/// A directory between a scanned root and a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    /// Display name as reported by the listing
    pub name: String,
    /// Opaque location of the directory
    pub location: String,
}

impl FolderRef {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// One discovered audio file
///
/// Two entries with the same location are the same file. A rescan produces
/// fresh entries instead of mutating old ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioEntry {
    /// Opaque location (path or document URI)
    pub location: String,
    /// Display name including extension
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time in Unix milliseconds, when known
    #[serde(default)]
    pub modified_at: Option<i64>,
    /// When the crawler found this file (Unix milliseconds)
    pub discovered_at: i64,
    /// Ancestor directories below the scanned root, outermost first
    #[serde(default)]
    pub folders: Vec<FolderRef>,
}

impl AudioEntry {
    /// Location of the directory holding this file, when it is below the root
    pub fn parent_location(&self) -> Option<&str> {
        self.folders.last().map(|folder| folder.location.as_str())
    }

    /// Lowercased extension
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Folder names followed by the file name
    pub fn segments(&self) -> impl Iterator<Item = &str> + Clone {
        self.folders
            .iter()
            .map(|folder| folder.name.as_str())
            .chain(std::iter::once(self.name.as_str()))
    }

    /// Natural order over the folder chain and file name
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        compare_segments(self.segments(), other.segments())
            .then_with(|| self.location.cmp(&other.location))
    }
}

impl PartialEq for AudioEntry {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for AudioEntry {}

/// A candidate cover image found while crawling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub location: String,
    pub name: String,
    /// Location of the directory listing that returned this image
    pub parent_location: String,
}

impl ImageEntry {
    /// Lowercased file name without extension
    pub fn basename(&self) -> String {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => self.name[..idx].to_lowercase(),
            _ => self.name.to_lowercase(),
        }
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

/// Lowercased text after the last dot of a display name
pub fn extension_of(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => Some(name[idx + 1..].to_lowercase()),
        _ => None,
    }
}

// =============================================================================
// Folder Structure
// =============================================================================

/// Layout of an external root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FolderStructureType {
    /// All audio directly in the root, no subfolders
    SingleFolder,
    /// One subfolder per book
    RootWithSubfolders,
    /// Author folders holding book folders
    AuthorBookStructure,
    /// Series folders holding book folders (grouped like author/book)
    SeriesBookStructure,
    /// Anything else
    Arbitrary,
}

impl FolderStructureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleFolder => "singleFolder",
            Self::RootWithSubfolders => "rootWithSubfolders",
            Self::AuthorBookStructure => "authorBookStructure",
            Self::SeriesBookStructure => "seriesBookStructure",
            Self::Arbitrary => "arbitrary",
        }
    }

    /// Whether groups are formed from two folder levels
    pub fn is_two_level(&self) -> bool {
        matches!(self, Self::AuthorBookStructure | Self::SeriesBookStructure)
    }
}

impl fmt::Display for FolderStructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Group
// =============================================================================

/// One logical audiobook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Human-readable name
    pub name: String,
    /// Canonical location; the group's identity
    pub location: String,
    /// Numeric folder id under the library-managed root
    #[serde(default)]
    pub collection_id: Option<u64>,
    /// Files in natural order (never empty)
    pub files: Vec<AudioEntry>,
    /// Resolved cover image location
    #[serde(default)]
    pub cover: Option<String>,
    /// Sum of file sizes
    pub total_size: u64,
    /// When the group was produced (Unix milliseconds)
    pub scanned_at: i64,
    /// Whether the group comes from an external root
    #[serde(default)]
    pub external: bool,
    /// Layout of the external root this group was formed under
    #[serde(default)]
    pub structure: Option<FolderStructureType>,
}

impl Group {
    /// Create a group, or `None` when there are no files
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        files: Vec<AudioEntry>,
        scanned_at: i64,
    ) -> Option<Self> {
        if files.is_empty() {
            return None;
        }

        let mut group = Self {
            name: name.into(),
            location: location.into(),
            collection_id: None,
            files,
            cover: None,
            total_size: 0,
            scanned_at,
            external: false,
            structure: None,
        };
        group.sort_files();
        Some(group)
    }

    pub fn with_collection_id(mut self, collection_id: Option<u64>) -> Self {
        self.collection_id = collection_id;
        self
    }

    pub fn with_cover(mut self, cover: Option<String>) -> Self {
        self.cover = cover;
        self
    }

    /// Mark as coming from an external root with the given layout
    pub fn with_structure(mut self, structure: FolderStructureType) -> Self {
        self.external = true;
        self.structure = Some(structure);
        self
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Sort files naturally and refresh the derived size
    pub fn sort_files(&mut self) {
        self.files.sort_by(|a, b| a.natural_cmp(b));
        self.total_size = self.files.iter().map(|file| file.size).sum();
    }

    /// Fold another group with the same location into this one
    ///
    /// File lists are concatenated (a file already present is kept once) and
    /// re-sorted. A missing cover is taken from `other`.
    pub fn merge(&mut self, other: Group) {
        let known: HashSet<String> = self.files.iter().map(|f| f.location.clone()).collect();
        self.files.extend(
            other
                .files
                .into_iter()
                .filter(|file| !known.contains(&file.location)),
        );
        if self.cover.is_none() {
            self.cover = other.cover;
        }
        if self.collection_id.is_none() {
            self.collection_id = other.collection_id;
        }
        self.scanned_at = self.scanned_at.max(other.scanned_at);
        self.sort_files();
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.location.trim().is_empty() {
            return Err("Group location cannot be empty".to_string());
        }
        if self.files.is_empty() {
            return Err(format!("Group {} has no files", self.location));
        }
        let size: u64 = self.files.iter().map(|file| file.size).sum();
        if size != self.total_size {
            return Err(format!(
                "Group {} total size {} does not match its files ({})",
                self.location, self.total_size, size
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Change Detection Records
// =============================================================================

/// Cached digest of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksumRecord {
    pub location: String,
    /// SHA-256, lowercase hex
    pub digest: String,
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<i64>,
    /// When the digest was computed (Unix milliseconds)
    pub computed_at: i64,
}

impl FileChecksumRecord {
    /// Whether size and modification time still match
    pub fn matches_signature(&self, size: u64, modified_at: Option<i64>) -> bool {
        self.size == size && self.modified_at == modified_at
    }
}

/// Cached summary of a root's last scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderScanState {
    pub root_location: String,
    /// Wall-clock time of the last pass that visited this root
    pub last_scan_time: i64,
    /// Root directory modification time observed at the last re-crawl
    pub last_modified_time: i64,
    pub file_count: usize,
    pub total_size: u64,
}

/// Aggregate view over the scan-state cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    /// Configured roots
    pub total_folders: usize,
    /// Configured roots with a cached scan state
    pub folders_scanned: usize,
    /// Configured roots a pass would re-crawl
    pub folders_needing_scan: usize,
    pub total_files: usize,
    pub total_size: u64,
    pub oldest_scan: Option<i64>,
    pub newest_scan: Option<i64>,
}
