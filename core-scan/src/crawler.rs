//! Directory crawler
//!
//! Depth-first traversal of one root. The result is a flat set of audio files
//! (each carrying the chain of directories between the root and itself) plus
//! the image files that may serve as covers. Ordering is left to grouping.

use std::sync::Arc;

use bridge_traits::storage::StorageAccess;
use bridge_traits::time::Clock;
use core_library::models::{extension_of, AudioEntry, FolderRef, ImageEntry};
use tracing::{debug, warn};

use crate::error::{recovery_for, FailureSite, Recovery, Result, ScanError};
use crate::filter::FolderFilter;

/// Audio extensions picked up while scanning
pub const SCAN_EXTENSIONS: &[&str] = &["mp3", "m4a", "m4b", "aac", "flac", "wav"];

/// Audio extensions accepted when looking up playable files
pub const LOOKUP_EXTENSIONS: &[&str] = &["mp3", "m4a", "m4b", "aac", "flac", "wav", "ogg", "opus"];

/// Image extensions collected as cover candidates
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn has_extension(name: &str, allowed: &[&str]) -> bool {
    extension_of(name).is_some_and(|ext| allowed.contains(&ext.as_str()))
}

pub fn is_audio_name(name: &str) -> bool {
    has_extension(name, SCAN_EXTENSIONS)
}

pub fn is_playable_name(name: &str) -> bool {
    has_extension(name, LOOKUP_EXTENSIONS)
}

pub fn is_image_name(name: &str) -> bool {
    has_extension(name, IMAGE_EXTENSIONS)
}

/// Everything found beneath one root
#[derive(Debug, Default, Clone)]
pub struct CrawlResult {
    pub audio_files: Vec<AudioEntry>,
    pub images: Vec<ImageEntry>,
    /// Directories left out by the folder filter
    pub skipped_directories: usize,
    /// Directories or entries that could not be read
    pub failed_entries: usize,
}

impl CrawlResult {
    pub fn total_size(&self) -> u64 {
        self.audio_files.iter().map(|file| file.size).sum()
    }
}

/// Recursive audio file discovery over the storage port
pub struct DirectoryCrawler {
    storage: Arc<dyn StorageAccess>,
    filter: Arc<FolderFilter>,
    clock: Arc<dyn Clock>,
}

impl DirectoryCrawler {
    pub fn new(storage: Arc<dyn StorageAccess>, filter: Arc<FolderFilter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            filter,
            clock,
        }
    }

    /// Crawl `root`, descending into subdirectories when `recursive` is set
    ///
    /// # Errors
    /// Fails with [`ScanError::RootUnavailable`] when the root itself cannot
    /// be listed. Unreadable subdirectories follow the crawl entry policy.
    pub async fn crawl(&self, root: &str, recursive: bool) -> Result<CrawlResult> {
        let discovered_at = self.clock.unix_timestamp_millis();
        let mut result = CrawlResult::default();
        let mut pending: Vec<(String, Vec<FolderRef>)> = vec![(root.to_string(), Vec::new())];

        while let Some((directory, folders)) = pending.pop() {
            let entries = match self.storage.list_entries(&directory).await {
                Ok(entries) => entries,
                Err(error) if folders.is_empty() => {
                    warn!(root = %directory, error = %error, "Cannot list root");
                    return Err(ScanError::RootUnavailable { root: directory });
                }
                Err(error) => match recovery_for(FailureSite::CrawlEntry) {
                    Recovery::SkipItem => {
                        warn!(folder = %directory, error = %error, "Skipping unreadable directory");
                        result.failed_entries += 1;
                        continue;
                    }
                    _ => {
                        return Err(ScanError::Listing {
                            location: directory,
                            message: error.to_string(),
                        });
                    }
                },
            };

            let mut subdirectories = Vec::new();
            for entry in entries {
                if entry.name.is_empty() {
                    result.failed_entries += 1;
                    continue;
                }
                let location = if entry.location.is_empty() {
                    self.storage.resolve_child(&directory, &entry.name)
                } else {
                    entry.location
                };

                if entry.is_directory {
                    if !recursive {
                        continue;
                    }
                    if self.filter.should_exclude_named(&location, &entry.name) {
                        result.skipped_directories += 1;
                        continue;
                    }
                    let mut chain = folders.clone();
                    chain.push(FolderRef::new(entry.name, location.clone()));
                    subdirectories.push((location, chain));
                } else if is_audio_name(&entry.name) {
                    debug!(file = %location, size = entry.size, "Found audio file");
                    result.audio_files.push(AudioEntry {
                        location,
                        name: entry.name,
                        size: entry.size,
                        modified_at: entry.modified_at,
                        discovered_at,
                        folders: folders.clone(),
                    });
                } else if is_image_name(&entry.name) {
                    result.images.push(ImageEntry {
                        location,
                        name: entry.name,
                        parent_location: directory.clone(),
                    });
                }
            }

            // Reverse so the first listed subdirectory is visited first
            pending.extend(subdirectories.into_iter().rev());
        }

        debug!(
            root,
            files = result.audio_files.len(),
            images = result.images.len(),
            skipped = result.skipped_directories,
            failed = result.failed_entries,
            "Crawl finished"
        );
        Ok(result)
    }

    /// Playable files directly inside `location`, in natural order
    pub async fn list_playable_files(&self, location: &str) -> Result<Vec<AudioEntry>> {
        let discovered_at = self.clock.unix_timestamp_millis();
        let entries = self
            .storage
            .list_entries(location)
            .await
            .map_err(|error| ScanError::Listing {
                location: location.to_string(),
                message: error.to_string(),
            })?;

        let mut files: Vec<AudioEntry> = entries
            .into_iter()
            .filter(|entry| !entry.is_directory && is_playable_name(&entry.name))
            .map(|entry| AudioEntry {
                location: if entry.location.is_empty() {
                    self.storage.resolve_child(location, &entry.name)
                } else {
                    entry.location
                },
                name: entry.name,
                size: entry.size,
                modified_at: entry.modified_at,
                discovered_at,
                folders: Vec::new(),
            })
            .collect();
        files.sort_by(|a, b| a.natural_cmp(b));
        Ok(files)
    }
}
