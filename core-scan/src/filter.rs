//! Folder filter
//!
//! Decides whether a directory is excluded from scanning. Each pattern is
//! compiled as a case-insensitive regular expression; a pattern that does not
//! compile is matched as a plain case-insensitive substring instead. Every
//! pattern is tried against the raw location, a separator-normalized form of
//! it and the bare directory name.

use core_runtime::config::{FilterMode, FilterSettings};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::{recovery_for, FailureSite, Recovery};

#[derive(Debug, Clone)]
enum Matcher {
    Pattern(Regex),
    Substring(String),
}

impl Matcher {
    fn compile(pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Matcher::Pattern(regex),
            Err(error) => {
                debug!(pattern, error = %error, "Filter pattern is not a regex, matching as substring");
                Matcher::Substring(pattern.to_lowercase())
            }
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Matcher::Pattern(regex) => regex.is_match(candidate),
            Matcher::Substring(needle) => candidate.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Blacklist or whitelist over directory locations
#[derive(Debug, Clone)]
pub struct FolderFilter {
    mode: FilterMode,
    matchers: Vec<Matcher>,
}

impl FolderFilter {
    pub fn new(settings: &FilterSettings) -> Self {
        let mut matchers = Vec::with_capacity(settings.patterns.len());
        for pattern in &settings.patterns {
            let pattern = pattern.trim();
            // An empty pattern would match every directory
            if pattern.is_empty() && recovery_for(FailureSite::FolderFilter) == Recovery::FailOpen {
                warn!("Ignoring empty folder filter pattern");
                continue;
            }
            matchers.push(Matcher::compile(pattern));
        }

        Self {
            mode: settings.mode,
            matchers,
        }
    }

    /// A filter that excludes nothing
    pub fn disabled() -> Self {
        Self {
            mode: FilterMode::Blacklist,
            matchers: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.matchers.is_empty()
    }

    /// Whether a directory should be skipped, deriving its name from the location
    pub fn should_exclude(&self, location: &str) -> bool {
        let normalized = normalize_location(location);
        let name = last_segment(&normalized);
        self.decide(location, &normalized, name)
    }

    /// Whether a directory should be skipped, given its display name
    pub fn should_exclude_named(&self, location: &str, name: &str) -> bool {
        let normalized = normalize_location(location);
        self.decide(location, &normalized, name)
    }

    /// Keep only the locations this filter does not exclude
    pub fn filter_roots<S: AsRef<str>>(&self, locations: &[S]) -> Vec<String> {
        locations
            .iter()
            .map(AsRef::as_ref)
            .filter(|location| !self.should_exclude(location))
            .map(str::to_string)
            .collect()
    }

    fn decide(&self, location: &str, normalized: &str, name: &str) -> bool {
        if self.matchers.is_empty() {
            return false;
        }

        let candidates = [location, normalized, name];
        let matched = self
            .matchers
            .iter()
            .any(|matcher| candidates.iter().any(|candidate| matcher.matches(candidate)));

        let excluded = match self.mode {
            FilterMode::Blacklist => matched,
            FilterMode::Whitelist => !matched,
        };
        if excluded {
            debug!(location, mode = self.mode.as_str(), "Folder excluded by filter");
        }
        excluded
    }
}

/// Location with `\` and the common percent escapes turned into plain text
pub fn normalize_location(location: &str) -> String {
    let mut normalized = location.replace('\\', "/");
    for (encoded, plain) in [("%2F", "/"), ("%2f", "/"), ("%3A", ":"), ("%3a", ":"), ("%20", " ")] {
        normalized = normalized.replace(encoded, plain);
    }
    normalized
}

fn last_segment(normalized: &str) -> &str {
    normalized
        .trim_end_matches('/')
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(normalized)
}
