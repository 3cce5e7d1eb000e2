//! Anchor-based patching of the virtual file set.
//!
//! A patch instruction is a sequence of blocks:
//!
//! ```text
//! <<<<
//! text expected in the file
//! ====
//! text to put in its place
//! >>>>
//! ```
//!
//! Blocks apply in order. A block whose anchor cannot be found is skipped
//! with a warning; it never aborts the remaining blocks or files.

use crate::files::VirtualFileSet;
use crate::parser::ParsedResponse;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const ANCHOR_START: &str = "<<<<";
pub const SEPARATOR: &str = "====";
pub const BLOCK_END: &str = ">>>>";

/// Anchor text longer than this is shortened in warnings.
const ANCHOR_PREVIEW_CHARS: usize = 80;

pub(crate) fn block_regex() -> &'static Regex {
    static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    BLOCK_REGEX.get_or_init(|| {
        Regex::new(r"(?s)<<<<[ \t]*\r?\n?(.*?)\r?\n?[ \t]*====[ \t]*\r?\n?(.*?)\r?\n?[ \t]*>>>>")
            .unwrap()
    })
}

/// One anchor/replacement pair. Only the line breaks that belong to the
/// marker lines are removed; inner whitespace is kept for exact matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchBlock {
    pub anchor: String,
    pub replacement: String,
}

/// How a single block landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMatch {
    Exact,
    Trimmed,
    Missed,
}

/// Non-fatal report of a block whose anchor was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchWarning {
    pub path: String,
    pub anchor_preview: String,
}

impl fmt::Display for PatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Patch failed for {}: {}", self.path, self.anchor_preview)
    }
}

/// Patched file set plus everything that did not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub files: VirtualFileSet,
    pub warnings: Vec<PatchWarning>,
    /// Number of blocks that matched (exactly or after trimming).
    pub applied: usize,
}

/// Split an instruction into its blocks, in order of appearance.
pub fn parse_blocks(instruction: &str) -> Vec<PatchBlock> {
    block_regex()
        .captures_iter(instruction)
        .filter_map(|caps| {
            Some(PatchBlock {
                anchor: caps.get(1)?.as_str().to_string(),
                replacement: caps.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Apply one block to `content`, replacing only the first occurrence.
pub fn apply_block(content: &mut String, block: &PatchBlock) -> BlockMatch {
    if !block.anchor.is_empty() {
        if let Some(idx) = content.find(&block.anchor) {
            content.replace_range(idx..idx + block.anchor.len(), &block.replacement);
            return BlockMatch::Exact;
        }
    }

    let anchor = block.anchor.trim();
    if anchor.is_empty() {
        return BlockMatch::Missed;
    }
    match content.find(anchor) {
        Some(idx) => {
            content.replace_range(idx..idx + anchor.len(), block.replacement.trim());
            BlockMatch::Trimmed
        }
        None => BlockMatch::Missed,
    }
}

/// Apply every instruction to the matching file of `current`.
///
/// Paths not present in `current` are ignored: patches never create files.
pub fn apply_patches(
    current: &VirtualFileSet,
    patches: &BTreeMap<String, String>,
) -> PatchOutcome {
    let mut outcome = PatchOutcome {
        files: current.clone(),
        ..PatchOutcome::default()
    };

    for (path, instruction) in patches {
        let Some(original) = current.get(path) else {
            debug!(%path, "patch targets a file that does not exist; skipping");
            continue;
        };

        let blocks = parse_blocks(instruction);
        if blocks.is_empty() {
            debug!(%path, "patch instruction holds no blocks");
            continue;
        }

        let mut content = original.to_string();
        for block in &blocks {
            match apply_block(&mut content, block) {
                BlockMatch::Exact | BlockMatch::Trimmed => outcome.applied += 1,
                BlockMatch::Missed => {
                    let anchor_preview = preview(block.anchor.trim());
                    warn!(%path, anchor = %anchor_preview, "patch anchor not found");
                    outcome.warnings.push(PatchWarning {
                        path: path.clone(),
                        anchor_preview,
                    });
                }
            }
        }

        outcome.files.insert(path.clone(), content);
    }

    outcome
}

/// Build the file set for a completed turn: patches first, then full-file
/// replacements on top, so a replaced file ignores its patches.
pub fn merge_turn(current: &VirtualFileSet, parsed: &ParsedResponse) -> PatchOutcome {
    let mut outcome = apply_patches(current, &parsed.patches);
    outcome.files.overlay(&parsed.files);
    outcome
}

fn preview(anchor: &str) -> String {
    match anchor.char_indices().nth(ANCHOR_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &anchor[..cut]),
        None => anchor.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(entries: &[(&str, &str)]) -> VirtualFileSet {
        entries.iter().copied().collect()
    }

    fn patches(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_blocks_in_order() {
        let blocks = parse_blocks("<<<<\n  a()\n====\n  b()\n>>>>\ntext\n<<<< x ==== y >>>>");
        assert_eq!(
            blocks,
            vec![
                PatchBlock {
                    anchor: "  a()".into(),
                    replacement: "  b()".into()
                },
                PatchBlock {
                    anchor: "x".into(),
                    replacement: "y".into()
                },
            ]
        );
    }

    #[test]
    fn test_exact_replaces_first_occurrence_only() {
        let files = set(&[("a.js", "f();\nf();\n")]);
        let outcome = apply_patches(&files, &patches(&[("a.js", "<<<<\nf();\n====\ng();\n>>>>")]));
        assert_eq!(outcome.files.get("a.js"), Some("g();\nf();\n"));
        assert_eq!(outcome.applied, 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_trimmed_fallback() {
        let mut content = "if (x) {\n  go();\n}".to_string();
        let block = PatchBlock {
            anchor: "    go();   ".into(),
            replacement: "  stop();  ".into(),
        };
        assert_eq!(apply_block(&mut content, &block), BlockMatch::Trimmed);
        assert_eq!(content, "if (x) {\n  stop();\n}");
    }

    #[test]
    fn test_missing_anchor_leaves_file_untouched() {
        let files = set(&[("script.js", "console.log(\"old\")")]);
        let outcome = apply_patches(
            &files,
            &patches(&[("script.js", "<<<<\nconsole.log(\"missing\")\n====\nx\n>>>>")]),
        );
        assert_eq!(outcome.files, files);
        assert_eq!(outcome.applied, 0);
        assert_eq!(
            outcome.warnings,
            vec![PatchWarning {
                path: "script.js".into(),
                anchor_preview: "console.log(\"missing\")".into(),
            }]
        );
    }

    #[test]
    fn test_failed_block_does_not_stop_later_blocks() {
        let files = set(&[("a.css", "a{}\nb{}")]);
        let instruction = "<<<<\nzzz\n====\nq\n>>>>\n<<<<\nb{}\n====\nb{color:red}\n>>>>";
        let outcome = apply_patches(&files, &patches(&[("a.css", instruction)]));
        assert_eq!(outcome.files.get("a.css"), Some("a{}\nb{color:red}"));
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_patch_never_creates_files() {
        let files = set(&[("a.js", "x")]);
        let outcome = apply_patches(&files, &patches(&[("new.js", "<<<<\nx\n====\ny\n>>>>")]));
        assert_eq!(outcome.files, files);
    }

    #[test]
    fn test_empty_patch_map_is_noop() {
        let files = set(&[("a.js", "x"), ("b.css", "y")]);
        let outcome = apply_patches(&files, &BTreeMap::new());
        assert_eq!(outcome.files, files);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_blank_anchor_is_a_miss() {
        let mut content = "abc".to_string();
        let block = PatchBlock {
            anchor: "  ".into(),
            replacement: "z".into(),
        };
        assert_eq!(apply_block(&mut content, &block), BlockMatch::Missed);
        assert_eq!(content, "abc");
    }

    #[test]
    fn test_preview_truncates_long_anchor() {
        let long = "é".repeat(100);
        let shortened = preview(&long);
        assert_eq!(shortened.chars().count(), 83);
        assert!(shortened.ends_with("..."));
    }

    #[test]
    fn test_full_file_wins_over_patch() {
        let files = set(&[("a.js", "old")]);
        let mut parsed = ParsedResponse::default();
        parsed.patches.insert("a.js".into(), "<<<<\nold\n====\npatched\n>>>>".into());
        parsed.files.insert("a.js".into(), "rewritten".into());
        parsed.files.insert("b.js".into(), "fresh".into());

        let outcome = merge_turn(&files, &parsed);
        assert_eq!(outcome.files.get("a.js"), Some("rewritten"));
        assert_eq!(outcome.files.get("b.js"), Some("fresh"));
    }
}
