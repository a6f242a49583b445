//! Location containment checks
//!
//! Locations are opaque strings. The only structure assumed here is that a
//! child location extends its parent across a separator: `/`, `\` or the
//! percent-encoded `%2F` used by document-tree URIs.

const SEPARATORS: [&str; 4] = ["/", "\\", "%2F", "%2f"];

fn ends_with_separator(location: &str) -> bool {
    SEPARATORS.iter().any(|sep| location.ends_with(sep))
}

fn starts_with_separator(rest: &str) -> bool {
    SEPARATORS.iter().any(|sep| rest.starts_with(sep))
}

/// Whether `location` is `root` or lies below it
pub fn is_within(location: &str, root: &str) -> bool {
    if root.is_empty() {
        return false;
    }
    match location.strip_prefix(root) {
        Some("") => true,
        Some(rest) => ends_with_separator(root) || starts_with_separator(rest),
        None => false,
    }
}

/// Whether either location extends the other
pub fn is_path_extension(a: &str, b: &str) -> bool {
    is_within(a, b) || is_within(b, a)
}
