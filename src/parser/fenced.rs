//! Infer file names for unlabelled, language-tagged code fences.
//!
//! The block holding an HTML document becomes `index.html`; its stylesheet and
//! script references, in declaration order, name the CSS and JS blocks.

use super::Extraction;
use crate::files::ENTRY_FILE;
use crate::resolver::is_remote;
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_STYLESHEET: (&str, &str) = ("styles", "css");
const DEFAULT_SCRIPT: (&str, &str) = ("script", "js");

fn fence_regex() -> &'static Regex {
    static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();
    FENCE_REGEX
        .get_or_init(|| Regex::new(r"(?s)```([A-Za-z0-9_+#.-]+)[^\n]*\n(.*?)```").unwrap())
}

pub(crate) fn document_marker_regex() -> &'static Regex {
    static DOCUMENT_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    DOCUMENT_MARKER_REGEX.get_or_init(|| Regex::new(r"(?i)<!doctype\s+html|<html[\s>]").unwrap())
}

fn stylesheet_ref_regex() -> &'static Regex {
    static STYLESHEET_REF_REGEX: OnceLock<Regex> = OnceLock::new();
    STYLESHEET_REF_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["']([^"']+\.css(?:[?#][^"']*)?)["']"#).unwrap()
    })
}

fn script_ref_regex() -> &'static Regex {
    static SCRIPT_REF_REGEX: OnceLock<Regex> = OnceLock::new();
    SCRIPT_REF_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*["']([^"']+\.m?js(?:[?#][^"']*)?)["']"#)
            .unwrap()
    })
}

pub(crate) fn warm() {
    fence_regex();
    document_marker_regex();
    stylesheet_ref_regex();
    script_ref_regex();
}

#[derive(Debug)]
struct Fence<'a> {
    lang: String,
    body: &'a str,
}

pub fn infer(text: &str) -> Option<Extraction> {
    let fences: Vec<Fence> = fence_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            Some(Fence {
                lang: caps.get(1)?.as_str().to_ascii_lowercase(),
                body: caps.get(2)?.as_str(),
            })
        })
        .collect();

    let mut extraction = Extraction::default();

    let entry = fences.iter().position(|f| document_marker_regex().is_match(f.body));
    let (stylesheet_refs, script_refs) = match entry {
        Some(idx) => {
            let body = fences[idx].body.trim_end();
            extraction.files.insert(ENTRY_FILE.to_string(), body.to_string());
            (
                local_refs(stylesheet_ref_regex(), body),
                local_refs(script_ref_regex(), body),
            )
        }
        None => (Vec::new(), Vec::new()),
    };

    let css: Vec<&str> = fences
        .iter()
        .enumerate()
        .filter(|(i, f)| Some(*i) != entry && f.lang == "css")
        .map(|(_, f)| f.body)
        .collect();
    let js: Vec<&str> = fences
        .iter()
        .enumerate()
        .filter(|(i, f)| {
            Some(*i) != entry && matches!(f.lang.as_str(), "js" | "javascript" | "mjs")
        })
        .map(|(_, f)| f.body)
        .collect();

    assign(&mut extraction, &css, &stylesheet_refs, DEFAULT_STYLESHEET);
    assign(&mut extraction, &js, &script_refs, DEFAULT_SCRIPT);

    extraction.non_empty()
}

/// Pair blocks with references positionally; surplus blocks get default names.
fn assign(extraction: &mut Extraction, blocks: &[&str], refs: &[String], default: (&str, &str)) {
    let (stem, ext) = default;
    for (i, body) in blocks.iter().enumerate() {
        let path = match refs.get(i) {
            Some(path) => path.clone(),
            None if refs.is_empty() && blocks.len() == 1 => format!("{}.{}", stem, ext),
            None => format!("{}-{}.{}", stem, i + 1, ext),
        };
        extraction.files.insert(path, body.trim_end().to_string());
    }
}

/// Local reference paths in declaration order, deduplicated, query stripped.
fn local_refs(regex: &Regex, html: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for caps in regex.captures_iter(html) {
        let Some(raw) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if is_remote(raw) {
            continue;
        }
        let path = raw.split(['?', '#']).next().unwrap_or(raw);
        let path = path.strip_prefix("./").unwrap_or(path).trim_start_matches('/');
        if !path.is_empty() && !refs.iter().any(|r| r == path) {
            refs.push(path.to_string());
        }
    }
    refs
}
