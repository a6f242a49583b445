//! Grouping engine
//!
//! Partitions a root's crawl result into groups. The library-managed root is
//! grouped by its numeric collection folders; external roots are grouped by
//! the layout the classifier reported. Files only ever carry the names and
//! locations of their ancestor folders, so no location is parsed here.

use std::collections::BTreeMap;

use core_library::models::{AudioEntry, FolderRef, FolderStructureType, Group, ImageEntry};
use core_library::ordering::compare_paths;
use core_runtime::config::ScanRoot;

use crate::cover::resolve_cover;

/// Where a file's group lives and what it is called
#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupKey {
    location: String,
    name: String,
    collection_id: Option<u64>,
}

impl GroupKey {
    fn folder(folder: &FolderRef) -> Self {
        Self {
            location: folder.location.clone(),
            name: folder.name.clone(),
            collection_id: None,
        }
    }

    fn root(root: &ScanRoot) -> Self {
        Self {
            location: root.location.clone(),
            name: root.name.clone(),
            collection_id: None,
        }
    }
}

/// Parse a folder name as a collection id
pub fn collection_id(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn library_key(root: &ScanRoot, file: &AudioEntry) -> GroupKey {
    let folders = &file.folders;
    let numeric = folders
        .iter()
        .enumerate()
        .find_map(|(idx, folder)| collection_id(&folder.name).map(|id| (idx, id)));

    match numeric {
        Some((idx, id)) => {
            // The folder after the id names the book; deeper folders fold in
            let folder = folders.get(idx + 1).unwrap_or(&folders[idx]);
            GroupKey {
                collection_id: Some(id),
                ..GroupKey::folder(folder)
            }
        }
        None => folders
            .last()
            .map(GroupKey::folder)
            .unwrap_or_else(|| GroupKey::root(root)),
    }
}

fn external_key(root: &ScanRoot, structure: FolderStructureType, file: &AudioEntry) -> GroupKey {
    let folders = &file.folders;
    if structure.is_two_level() {
        return match folders.as_slice() {
            [first, second, ..] => GroupKey {
                location: second.location.clone(),
                name: format!("{} - {}", first.name, second.name),
                collection_id: None,
            },
            [only] => GroupKey::folder(only),
            [] => GroupKey::root(root),
        };
    }

    match structure {
        FolderStructureType::SingleFolder => GroupKey::root(root),
        FolderStructureType::RootWithSubfolders => folders
            .first()
            .map(GroupKey::folder)
            .unwrap_or_else(|| GroupKey::root(root)),
        // Arbitrary
        _ => folders
            .last()
            .map(GroupKey::folder)
            .unwrap_or_else(|| GroupKey::root(root)),
    }
}

fn build_groups<F>(
    files: Vec<AudioEntry>,
    images: &[ImageEntry],
    scanned_at: i64,
    key_for: F,
) -> Vec<Group>
where
    F: Fn(&AudioEntry) -> GroupKey,
{
    let mut buckets: BTreeMap<String, (GroupKey, Vec<AudioEntry>)> = BTreeMap::new();
    for file in files {
        let key = key_for(&file);
        buckets
            .entry(key.location.clone())
            .or_insert_with(|| (key, Vec::new()))
            .1
            .push(file);
    }

    let mut groups: Vec<Group> = buckets
        .into_values()
        .filter_map(|(key, files)| {
            let cover = resolve_cover(&key.location, images);
            Group::new(key.name, key.location, files, scanned_at).map(|group| {
                group
                    .with_collection_id(key.collection_id)
                    .with_cover(cover)
            })
        })
        .collect();
    groups.sort_by(|a, b| compare_paths(&a.location, &b.location));
    groups
}

/// Group the library-managed root by collection folders
pub fn group_library(
    root: &ScanRoot,
    files: Vec<AudioEntry>,
    images: &[ImageEntry],
    scanned_at: i64,
) -> Vec<Group> {
    build_groups(files, images, scanned_at, |file| library_key(root, file))
}

/// Group an external root according to its classified layout
pub fn group_external(
    root: &ScanRoot,
    structure: FolderStructureType,
    files: Vec<AudioEntry>,
    images: &[ImageEntry],
    scanned_at: i64,
) -> Vec<Group> {
    build_groups(files, images, scanned_at, |file| {
        external_key(root, structure, file)
    })
    .into_iter()
    .map(|group| group.with_structure(structure))
    .collect()
}

/// Merge groups sharing a location and order the result by location
pub fn merge_groups(groups: Vec<Group>) -> Vec<Group> {
    let mut merged: BTreeMap<String, Group> = BTreeMap::new();
    for group in groups {
        match merged.get_mut(&group.location) {
            Some(existing) => existing.merge(group),
            None => {
                merged.insert(group.location.clone(), group);
            }
        }
    }

    let mut groups: Vec<Group> = merged.into_values().collect();
    groups.sort_by(|a, b| compare_paths(&a.location, &b.location));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an entry under `root` from a relative `a/b/file.mp3` path
    fn file(root: &str, relative: &str) -> AudioEntry {
        let parts: Vec<&str> = relative.split('/').collect();
        let (name, dirs) = parts.split_last().unwrap();
        let mut location = root.to_string();
        let mut folders = Vec::new();
        for dir in dirs {
            location = format!("{location}/{dir}");
            folders.push(FolderRef::new(*dir, location.clone()));
        }
        AudioEntry {
            location: format!("{location}/{name}"),
            name: name.to_string(),
            size: 10,
            modified_at: Some(1),
            discovered_at: 1,
            folders,
        }
    }

    fn summary(groups: &[Group]) -> Vec<(String, String, usize)> {
        groups
            .iter()
            .map(|g| (g.name.clone(), g.location.clone(), g.files.len()))
            .collect()
    }

    #[test]
    fn test_collection_id_parsing() {
        assert_eq!(collection_id("4821"), Some(4821));
        assert_eq!(collection_id("0042"), Some(42));
        assert_eq!(collection_id(""), None);
        assert_eq!(collection_id("12a"), None);
        assert_eq!(collection_id("-1"), None);
        assert_eq!(collection_id("99999999999999999999999"), None);
    }

    #[test]
    fn test_library_collection_folder_names_the_group() {
        let root = ScanRoot::library("/lib", "Library");
        let groups = group_library(
            &root,
            vec![
                file("/lib", "4821/Book Title/part1.mp3"),
                file("/lib", "4821/Book Title/CD 2/part2.mp3"),
            ],
            &[],
            7,
        );

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.location, "/lib/4821/Book Title");
        assert_eq!(group.name, "Book Title");
        assert_eq!(group.collection_id, Some(4821));
        assert_eq!(group.files.len(), 2);
        assert!(!group.external);
    }

    #[test]
    fn test_library_numeric_leaf_is_the_group() {
        let root = ScanRoot::library("/lib", "Library");
        let groups = group_library(&root, vec![file("/lib", "Downloads/77/a.mp3")], &[], 1);

        assert_eq!(
            summary(&groups),
            vec![("77".to_string(), "/lib/Downloads/77".to_string(), 1)]
        );
        assert_eq!(groups[0].collection_id, Some(77));
    }

    #[test]
    fn test_library_without_numbers_uses_deepest_folder() {
        let root = ScanRoot::library("/lib", "Library");
        let groups = group_library(
            &root,
            vec![file("/lib", "Author/Book/a.mp3"), file("/lib", "loose.mp3")],
            &[],
            1,
        );

        assert_eq!(
            summary(&groups),
            vec![
                ("Library".to_string(), "/lib".to_string(), 1),
                ("Book".to_string(), "/lib/Author/Book".to_string(), 1),
            ]
        );
        assert_eq!(groups[1].collection_id, None);
    }

    #[test]
    fn test_external_single_folder() {
        let root = ScanRoot::external("/ext", "Ext");
        let groups = group_external(
            &root,
            FolderStructureType::SingleFolder,
            vec![file("/ext", "2.mp3"), file("/ext", "10.mp3"), file("/ext", "1.mp3")],
            &[],
            1,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].location, "/ext");
        let names: Vec<_> = groups[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["1.mp3", "2.mp3", "10.mp3"]);
        assert_eq!(groups[0].structure, Some(FolderStructureType::SingleFolder));
        assert!(groups[0].external);
    }

    #[test]
    fn test_external_root_with_subfolders() {
        let root = ScanRoot::external("/ext", "Ext");
        let groups = group_external(
            &root,
            FolderStructureType::RootWithSubfolders,
            vec![
                file("/ext", "Book B/1.mp3"),
                file("/ext", "Book A/1.mp3"),
                file("/ext", "Book A/Disc 2/1.mp3"),
            ],
            &[],
            1,
        );

        assert_eq!(
            summary(&groups),
            vec![
                ("Book A".to_string(), "/ext/Book A".to_string(), 2),
                ("Book B".to_string(), "/ext/Book B".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_external_author_book_names() {
        let root = ScanRoot::external("/ext", "Ext");
        let groups = group_external(
            &root,
            FolderStructureType::AuthorBookStructure,
            vec![
                file("/ext", "Author A/Book One/1.mp3"),
                file("/ext", "Author A/Book Two/1.mp3"),
                file("/ext", "Author A/intro.mp3"),
            ],
            &[],
            1,
        );

        assert_eq!(
            summary(&groups),
            vec![
                ("Author A".to_string(), "/ext/Author A".to_string(), 1),
                (
                    "Author A - Book One".to_string(),
                    "/ext/Author A/Book One".to_string(),
                    1
                ),
                (
                    "Author A - Book Two".to_string(),
                    "/ext/Author A/Book Two".to_string(),
                    1
                ),
            ]
        );
    }

    #[test]
    fn test_external_series_book_names() {
        let root = ScanRoot::external("/ext", "Ext");
        let groups = group_external(
            &root,
            FolderStructureType::SeriesBookStructure,
            vec![
                file("/ext", "Dune Saga/Dune/Part 2.mp3"),
                file("/ext", "Dune Saga/Dune/Part 10.mp3"),
                file("/ext", "Dune Saga/Dune Messiah/CD1/01.mp3"),
            ],
            &[],
            1,
        );

        assert_eq!(
            summary(&groups),
            vec![
                (
                    "Dune Saga - Dune".to_string(),
                    "/ext/Dune Saga/Dune".to_string(),
                    2
                ),
                (
                    "Dune Saga - Dune Messiah".to_string(),
                    "/ext/Dune Saga/Dune Messiah".to_string(),
                    1
                ),
            ]
        );
        let names: Vec<_> = groups[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Part 2.mp3", "Part 10.mp3"]);
    }

    #[test]
    fn test_external_arbitrary_uses_deepest_folder() {
        let root = ScanRoot::external("/ext", "Ext");
        let groups = group_external(
            &root,
            FolderStructureType::Arbitrary,
            vec![
                file("/ext", "a.mp3"),
                file("/ext", "X/Y/Z/b.mp3"),
                file("/ext", "X/c.mp3"),
            ],
            &[],
            1,
        );

        let locations: Vec<_> = groups.iter().map(|g| g.location.as_str()).collect();
        assert_eq!(locations, vec!["/ext", "/ext/X", "/ext/X/Y/Z"]);
    }

    #[test]
    fn test_cover_is_resolved_per_group() {
        let root = ScanRoot::external("/ext", "Ext");
        let images = vec![ImageEntry {
            location: "/ext/Book A/cover.jpg".to_string(),
            name: "cover.jpg".to_string(),
            parent_location: "/ext/Book A".to_string(),
        }];
        let groups = group_external(
            &root,
            FolderStructureType::RootWithSubfolders,
            vec![file("/ext", "Book A/1.mp3"), file("/ext", "Book B/1.mp3")],
            &images,
            1,
        );

        assert_eq!(groups[0].cover.as_deref(), Some("/ext/Book A/cover.jpg"));
        assert_eq!(groups[1].cover, None);
    }

    #[test]
    fn test_merge_groups_with_same_location() {
        let root = ScanRoot::external("/ext", "Ext");
        let first = group_external(
            &root,
            FolderStructureType::SingleFolder,
            vec![file("/ext", "2.mp3")],
            &[],
            1,
        );
        let second = group_external(
            &root,
            FolderStructureType::SingleFolder,
            vec![file("/ext", "1.mp3")],
            &[],
            2,
        );

        let merged = merge_groups(first.into_iter().chain(second).collect());

        assert_eq!(merged.len(), 1);
        let names: Vec<_> = merged[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["1.mp3", "2.mp3"]);
        assert_eq!(merged[0].total_size, 20);
    }
}
