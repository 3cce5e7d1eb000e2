//! Marker-delimited sections: each marker names a path and owns the text up to
//! the next marker (or the end of the response).

use super::{strip_code_fence, Extraction};
use regex::Regex;
use std::sync::OnceLock;

fn strict_marker_regex() -> &'static Regex {
    static STRICT_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    STRICT_MARKER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(?:<!--|/\*)\s*(filename|patch)\s*:\s*(\S+?)\s*(?:-->|\*/)").unwrap()
    })
}

/// A line holding nothing but a file name with a known extension, optionally
/// wrapped in a comment, a markdown heading, bold or backticks.
fn loose_marker_regex() -> &'static Regex {
    static LOOSE_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    LOOSE_MARKER_REGEX.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t]*(?:<!--|/\*|//|#{1,6})?[ \t]*(?:\*\*|`)?([A-Za-z0-9_][A-Za-z0-9_./-]*\.(?:html|css|js|json|md))(?:\*\*|`)?[ \t]*:?[ \t]*(?:-->|\*/)?[ \t]*\r?$",
        )
        .unwrap()
    })
}

pub(crate) fn warm() {
    strict_marker_regex();
    loose_marker_regex();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    File,
    Patch,
}

#[derive(Debug)]
struct Marker {
    kind: MarkerKind,
    path: String,
    start: usize,
    end: usize,
}

/// `<!-- filename: PATH -->`, `/* patch: PATH */` and friends.
pub fn strict(text: &str) -> Option<Extraction> {
    let markers: Vec<Marker> = strict_marker_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = if caps.get(1)?.as_str().eq_ignore_ascii_case("patch") {
                MarkerKind::Patch
            } else {
                MarkerKind::File
            };
            Some(Marker {
                kind,
                path: normalize_marker_path(caps.get(2)?.as_str()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect();

    collect_sections(text, &markers).non_empty()
}

/// Bare file-name lines such as `styles.css` or `<!-- app.js -->`.
pub fn loose(text: &str) -> Option<Extraction> {
    let markers: Vec<Marker> = loose_marker_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Marker {
                kind: MarkerKind::File,
                path: normalize_marker_path(caps.get(1)?.as_str()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect();

    collect_sections(text, &markers).non_empty()
}

fn collect_sections(text: &str, markers: &[Marker]) -> Extraction {
    let mut extraction = Extraction::default();

    for (i, marker) in markers.iter().enumerate() {
        if marker.path.is_empty() {
            continue;
        }
        let section_end = markers.get(i + 1).map(|next| next.start).unwrap_or(text.len());
        let content = strip_code_fence(&text[marker.end..section_end]);

        let target = match marker.kind {
            MarkerKind::File => &mut extraction.files,
            MarkerKind::Patch => &mut extraction.patches,
        };
        target.insert(marker.path.clone(), content);
    }

    extraction
}

fn normalize_marker_path(raw: &str) -> String {
    let path = raw.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/').to_string()
}
