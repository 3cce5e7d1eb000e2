use regex::Regex;
use std::sync::OnceLock;

pub(crate) fn thinking_regex() -> &'static Regex {
    static THINKING_REGEX: OnceLock<Regex> = OnceLock::new();
    THINKING_REGEX.get_or_init(|| Regex::new(r"(?is)<thinking>(.*?)</thinking>").unwrap())
}

/// Remove the first `<thinking>…</thinking>` block (any case).
///
/// Returns the trimmed inner text (`None` when absent or blank) and the text
/// with that block removed.
pub fn extract(text: &str) -> (Option<String>, String) {
    let Some(caps) = thinking_regex().captures(text) else {
        return (None, text.to_string());
    };

    let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
        return (None, text.to_string());
    };

    let mut rest = String::with_capacity(text.len() - whole.len());
    rest.push_str(&text[..whole.start()]);
    rest.push_str(&text[whole.end()..]);

    let thought = inner.as_str().trim();
    let thought = if thought.is_empty() {
        None
    } else {
        Some(thought.to_string())
    };

    (thought, rest)
}
