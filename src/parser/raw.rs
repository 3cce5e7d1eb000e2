use super::fenced::document_marker_regex;
use super::Extraction;
use crate::files::ENTRY_FILE;

/// Last resort: the response is (or ends with) a bare HTML document.
pub fn html_document(text: &str) -> Option<Extraction> {
    let start = document_marker_regex().find(text)?.start();
    let document = text[start..].trim_end();

    let mut extraction = Extraction {
        used_fallback: true,
        ..Extraction::default()
    };
    extraction.files.insert(ENTRY_FILE.to_string(), document.to_string());
    Some(extraction)
}
