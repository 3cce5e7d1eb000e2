//! Tolerant lookup of asset references found in generated HTML.
//!
//! Generated markup mixes `styles.css`, `/styles.css`, `./css/styles.css` and
//! `../styles.css?v=3` for the same file, so a reference is tried against the
//! file set in progressively looser forms.

use crate::files::VirtualFileSet;

/// Resolve `reference` to a key of `files`.
///
/// Candidates, in order: the path itself (query and fragment removed), the
/// path without leading slashes, the path with empty, `.` and `..` segments
/// folded, the bare file name, and finally any key whose last segment is that
/// file name. Remote and `data:` references never resolve.
///
/// The last step matches whole segments only: `main.css` finds `css/main.css`
/// but not `css/xmain.css`, although both end with the same text.
pub fn resolve<'a>(files: &'a VirtualFileSet, reference: &str) -> Option<&'a str> {
    let reference = reference.trim();
    if reference.is_empty() || is_remote(reference) {
        return None;
    }

    let clean = reference.split(['?', '#']).next().unwrap_or(reference);
    if let Some(key) = files.key(clean) {
        return Some(key);
    }

    let unrooted = clean.trim_start_matches('/');
    if let Some(key) = files.key(unrooted) {
        return Some(key);
    }

    let segments = normalize_segments(unrooted);
    let joined = segments.join("/");
    if let Some(key) = files.key(&joined) {
        return Some(key);
    }

    let base = *segments.last()?;
    if let Some(key) = files.key(base) {
        return Some(key);
    }

    files.paths().find(|key| {
        key.strip_suffix(base)
            .is_some_and(|prefix| prefix.ends_with('/'))
    })
}

/// Absolute URLs and inline data never map to project files.
pub fn is_remote(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
        || lower.starts_with("data:")
}

fn normalize_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}
