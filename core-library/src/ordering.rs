//! Natural ordering of path segments
//!
//! A segment is read as alternating runs of text and ASCII digits. Runs are
//! compared pairwise: digits numerically and text case-insensitively. A
//! digit run facing a text run sorts as if it were the character `0`, so
//! "a.flac" precedes "a1.flac" and "2 Intro" precedes "Chapter 1". This puts
//! "Part 2" before "Part 10" and is a total order, so it is safe to hand to
//! `sort_by`. Sequences that are equal under that rule are finally ordered by
//! their raw bytes.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    /// Digits without leading zeros ("0" for an all-zero run)
    Number(&'a str),
    Text(&'a str),
}

/// Split a segment into maximal digit and non-digit runs
fn runs(segment: &str) -> impl Iterator<Item = Run<'_>> {
    let mut rest = segment;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(if digits {
            let trimmed = run.trim_start_matches('0');
            Run::Number(if trimmed.is_empty() { "0" } else { trimmed })
        } else {
            Run::Text(run)
        })
    })
}

/// Compare two digit strings without parsing (no overflow on long runs)
fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// A text run never starts with an ASCII digit, so this is never `Equal`
fn number_against_text(text: &str) -> Ordering {
    let first = text.chars().flat_map(char::to_lowercase).next();
    match first {
        Some(c) if c < '0' => Ordering::Greater,
        _ => Ordering::Less,
    }
}

fn compare_runs(a: Run<'_>, b: Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Number(x), Run::Number(y)) => compare_digits(x, y),
        (Run::Text(x), Run::Text(y)) => compare_case_insensitive(x, y),
        (Run::Number(_), Run::Text(text)) => number_against_text(text),
        (Run::Text(text), Run::Number(_)) => number_against_text(text).reverse(),
    }
}

/// Compare two single segments
///
/// Segments differing only in letter case or leading zeros compare equal.
pub fn compare_segment(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match compare_runs(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Compare two segment sequences piecewise
pub fn compare_segments<'a, A, B>(a: A, b: B) -> Ordering
where
    A: IntoIterator<Item = &'a str> + Clone,
    B: IntoIterator<Item = &'a str> + Clone,
{
    let mut left = a.clone().into_iter();
    let mut right = b.clone().into_iter();
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match compare_segment(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => break,
        }
    }
    a.into_iter().cmp(b)
}

fn split_path(path: &str) -> impl Iterator<Item = &str> + Clone {
    path.split(|c: char| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty())
}

/// Natural comparison of two `/` or `\` separated paths
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    compare_segments(split_path(a), split_path(b)).then_with(|| a.cmp(b))
}
