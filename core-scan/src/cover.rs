//! Cover image resolution

use core_library::models::ImageEntry;

/// Preferred cover basenames, best first
pub const COVER_BASENAMES: &[&str] = &["cover", "folder", "album", "artwork", "art"];

/// Preferred cover extensions, best first
pub const COVER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn rank(image: &ImageEntry) -> Option<(usize, usize)> {
    let basename = image.basename();
    let name_rank = COVER_BASENAMES.iter().position(|name| *name == basename)?;
    let extension = image.extension()?;
    let ext_rank = COVER_EXTENSIONS.iter().position(|ext| *ext == extension)?;
    Some((name_rank, ext_rank))
}

/// Pick the cover for the group at `group_location`
///
/// Only images listed directly in the group's directory are considered. A
/// well-known name wins; otherwise a lone image is used.
pub fn resolve_cover(group_location: &str, images: &[ImageEntry]) -> Option<String> {
    let candidates: Vec<&ImageEntry> = images
        .iter()
        .filter(|image| image.parent_location == group_location)
        .collect();

    let named = candidates
        .iter()
        .filter_map(|image| rank(image).map(|rank| (rank, *image)))
        .min_by(|(a, left), (b, right)| a.cmp(b).then_with(|| left.location.cmp(&right.location)));
    if let Some((_, image)) = named {
        return Some(image.location.clone());
    }

    match candidates.as_slice() {
        [only] => Some(only.location.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(parent: &str, name: &str) -> ImageEntry {
        ImageEntry {
            location: format!("{parent}/{name}"),
            name: name.to_string(),
            parent_location: parent.to_string(),
        }
    }

    #[test]
    fn test_prefers_known_names_in_order() {
        let images = vec![
            image("/b", "art.jpg"),
            image("/b", "Folder.png"),
            image("/b", "folder.jpg"),
            image("/b", "random.jpg"),
        ];
        assert_eq!(resolve_cover("/b", &images).as_deref(), Some("/b/folder.jpg"));
    }

    #[test]
    fn test_single_unnamed_image_is_used() {
        let images = vec![image("/b", "scan_0001.webp"), image("/b/sub", "cover.jpg")];
        assert_eq!(resolve_cover("/b", &images).as_deref(), Some("/b/scan_0001.webp"));
    }

    #[test]
    fn test_ambiguous_images_give_no_cover() {
        let images = vec![image("/b", "one.jpg"), image("/b", "two.jpg")];
        assert_eq!(resolve_cover("/b", &images), None);
        assert_eq!(resolve_cover("/other", &images), None);
    }
}
