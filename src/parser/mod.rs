//! # Response parser
//!
//! Recovers file replacements and patch instructions from a finished model
//! response. The thinking block is always extracted first; the remaining text
//! then goes through an ordered list of strategies, and the first one that
//! produces anything supplies the whole result:
//!
//! 1. [`ParseTier::StrictMarkers`]: `<!-- filename: PATH -->` / `/* patch: PATH */`
//! 2. [`ParseTier::LooseMarkers`]: a bare `index.html`-style line before each file
//! 3. [`ParseTier::FencedBlocks`]: language-tagged code fences, wired up via the
//!    entry document's `<link>`/`<script>` references
//! 4. [`ParseTier::RawHtml`]: everything from the HTML signature onward
//!
//! Parsing never fails. Text nothing understands yields an empty
//! [`ParsedResponse`], which callers treat as "no changes".

pub mod fenced;
pub mod markers;
pub mod raw;
pub mod thought;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Which strategy produced a [`ParsedResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseTier {
    StrictMarkers,
    LooseMarkers,
    FencedBlocks,
    RawHtml,
}

/// Structured result of one completed model turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResponse {
    pub thought: Option<String>,
    /// Full-file replacements keyed by path.
    pub files: BTreeMap<String, String>,
    /// Raw patch instruction text keyed by path.
    pub patches: BTreeMap<String, String>,
    pub used_fallback: bool,
    pub tier: Option<ParseTier>,
}

impl ParsedResponse {
    /// True when the response carries no file changes.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.patches.is_empty()
    }
}

/// Partial result of a single strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub files: BTreeMap<String, String>,
    pub patches: BTreeMap<String, String>,
    pub used_fallback: bool,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.patches.is_empty()
    }

    /// `Some(self)` unless nothing was extracted.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// A pure parsing strategy: text in, extraction out (or nothing).
pub type Strategy = fn(&str) -> Option<Extraction>;

/// Strategies in the order they are attempted.
pub const STRATEGIES: &[(ParseTier, Strategy)] = &[
    (ParseTier::StrictMarkers, markers::strict),
    (ParseTier::LooseMarkers, markers::loose),
    (ParseTier::FencedBlocks, fenced::infer),
    (ParseTier::RawHtml, raw::html_document),
];

/// Run `strategies` in order and return the first non-empty extraction.
pub fn first_success(
    text: &str,
    strategies: &[(ParseTier, Strategy)],
) -> Option<(ParseTier, Extraction)> {
    strategies
        .iter()
        .find_map(|(tier, strategy)| strategy(text).map(|extraction| (*tier, extraction)))
}

/// Parse a finished response.
///
/// A captured thought does not suppress the file strategies: a response that
/// explains itself and then dumps a raw document still yields that document.
pub fn parse_response(text: &str) -> ParsedResponse {
    let (thought, body) = thought::extract(text);

    let Some((tier, extraction)) = first_success(&body, STRATEGIES) else {
        debug!(has_thought = thought.is_some(), "no strategy matched the response");
        return ParsedResponse {
            thought,
            ..ParsedResponse::default()
        };
    };

    debug!(
        ?tier,
        files = extraction.files.len(),
        patches = extraction.patches.len(),
        "parsed model response"
    );

    ParsedResponse {
        thought,
        files: extraction.files,
        patches: extraction.patches,
        used_fallback: extraction.used_fallback,
        tier: Some(tier),
    }
}

/// Strip a leading code fence opener and a closer that ends the section.
///
/// Fences inside the body (nested markdown, backticks in JS strings) are kept.
pub(crate) fn strip_code_fence(section: &str) -> String {
    let trimmed = section.trim();
    let Some(after_ticks) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    let lang_len = after_ticks
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_ticks.len());
    let rest = &after_ticks[lang_len..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let Some(body) = body.strip_suffix("```") else {
        return body.to_string();
    };

    body.strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_success_stops_at_first_match() {
        fn never(_: &str) -> Option<Extraction> {
            None
        }
        fn always(_: &str) -> Option<Extraction> {
            let mut e = Extraction::default();
            e.files.insert("a.js".into(), "1".into());
            Some(e)
        }
        fn unreachable_tier(_: &str) -> Option<Extraction> {
            panic!("later strategy must not run");
        }

        let strategies: &[(ParseTier, Strategy)] = &[
            (ParseTier::StrictMarkers, never),
            (ParseTier::LooseMarkers, always),
            (ParseTier::FencedBlocks, unreachable_tier),
        ];
        let (tier, extraction) = first_success("", strategies).unwrap();
        assert_eq!(tier, ParseTier::LooseMarkers);
        assert_eq!(extraction.files.get("a.js").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_parse_strict_file_marker() {
        let parsed = parse_response("<!-- filename: index.html -->\n<h1>Hi</h1>");
        let mut expected = BTreeMap::new();
        expected.insert("index.html".to_string(), "<h1>Hi</h1>".to_string());

        assert_eq!(parsed.files, expected);
        assert!(parsed.patches.is_empty());
        assert_eq!(parsed.thought, None);
        assert!(!parsed.used_fallback);
        assert_eq!(parsed.tier, Some(ParseTier::StrictMarkers));
    }

    #[test]
    fn test_thought_does_not_block_raw_fallback() {
        let parsed = parse_response("<thinking>Rebuild</thinking>\n<!DOCTYPE html><html></html>");
        assert_eq!(parsed.thought.as_deref(), Some("Rebuild"));
        assert_eq!(
            parsed.files.get("index.html").map(String::as_str),
            Some("<!DOCTYPE html><html></html>")
        );
        assert!(parsed.used_fallback);
    }

    #[test]
    fn test_unrecognised_text_is_empty() {
        let parsed = parse_response("Sure! Which colour would you like?");
        assert!(parsed.is_empty());
        assert_eq!(parsed.thought, None);
        assert_eq!(parsed.tier, None);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("\n```js\nlet a = 1;\n```\n"), "let a = 1;");
        assert_eq!(
            strip_code_fence("```\nx\n```\nThis adds x."),
            "x\n```\nThis adds x."
        );
        assert_eq!(strip_code_fence("  plain  "), "plain");
        assert_eq!(strip_code_fence("```css\nbody{}"), "body{}");
        assert_eq!(strip_code_fence("```js\n```"), "");
    }

    #[test]
    fn test_nested_fences_survive_in_markdown() {
        let parsed = parse_response(
            "<!-- filename: README.md -->\n```markdown\n# Title\n\n```js\nrun();\n```\n\nMore docs.\n```",
        );
        assert_eq!(
            parsed.files["README.md"],
            "# Title\n\n```js\nrun();\n```\n\nMore docs."
        );
    }

    #[test]
    fn test_backticks_in_js_template_survive() {
        let parsed = parse_response(
            "/* filename: app.js */\n```js\nconst md = `\n```\ncode\n```\n`;\nrender(md);\n```",
        );
        assert_eq!(
            parsed.files["app.js"],
            "const md = `\n```\ncode\n```\n`;\nrender(md);"
        );
    }

    #[test]
    fn test_patch_section_keeps_inner_fences() {
        let parsed = parse_response(
            "<!-- patch: notes.md -->\n```\n<<<<\n```sh\nold\n```\n====\n```sh\nnew\n```\n>>>>\n```",
        );
        assert_eq!(
            parsed.patches["notes.md"],
            "<<<<\n```sh\nold\n```\n====\n```sh\nnew\n```\n>>>>"
        );
    }
}
