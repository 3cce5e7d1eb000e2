use super::instrument::INSTRUMENTATION_SCRIPT;
use crate::files::{is_data_url, VirtualFileSet, ENTRY_FILE};
use crate::resolver::resolve;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

fn link_regex() -> &'static Regex {
    static LINK_REGEX: OnceLock<Regex> = OnceLock::new();
    LINK_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<link\b[^>]*?\shref\s*=\s*["']([^"']+)["'][^>]*>"#).unwrap()
    })
}

fn script_regex() -> &'static Regex {
    static SCRIPT_REGEX: OnceLock<Regex> = OnceLock::new();
    SCRIPT_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)<script\b([^>]*?)\ssrc\s*=\s*["']([^"']+)["']([^>]*)>\s*</script\s*>"#)
            .unwrap()
    })
}

fn img_regex() -> &'static Regex {
    static IMG_REGEX: OnceLock<Regex> = OnceLock::new();
    IMG_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<img\b([^>]*?)\ssrc\s*=\s*["']([^"']+)["']([^>]*)>"#).unwrap()
    })
}

fn untyped_script_regex() -> &'static Regex {
    static UNTYPED_SCRIPT_REGEX: OnceLock<Regex> = OnceLock::new();
    UNTYPED_SCRIPT_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?is)<script\b[^>]*\ssrc\s*=\s*["'][^"']+\.(?:ts|tsx)(?:[?#][^"']*)?["'][^>]*>\s*</script\s*>"#,
        )
        .unwrap()
    })
}

fn head_close_regex() -> &'static Regex {
    static HEAD_CLOSE_REGEX: OnceLock<Regex> = OnceLock::new();
    HEAD_CLOSE_REGEX.get_or_init(|| Regex::new(r"(?i)</head\s*>").unwrap())
}

fn script_close_regex() -> &'static Regex {
    static SCRIPT_CLOSE_REGEX: OnceLock<Regex> = OnceLock::new();
    SCRIPT_CLOSE_REGEX.get_or_init(|| Regex::new(r"(?i)</script").unwrap())
}

fn style_close_regex() -> &'static Regex {
    static STYLE_CLOSE_REGEX: OnceLock<Regex> = OnceLock::new();
    STYLE_CLOSE_REGEX.get_or_init(|| Regex::new(r"(?i)</style").unwrap())
}

pub(crate) fn warm() {
    link_regex();
    script_regex();
    img_regex();
    untyped_script_regex();
    head_close_regex();
    script_close_regex();
    style_close_regex();
}

/// Build the self-contained, instrumented preview document.
///
/// Returns `None` when the set has no `index.html`. The bridge goes in first
/// so a `</head>` inside inlined content is never taken for the real one.
pub fn assemble_document(files: &VirtualFileSet) -> Option<String> {
    let entry = files.get(ENTRY_FILE)?;

    let html = inject_instrumentation(entry);
    let html = inline_stylesheets(&html, files);
    let html = inline_scripts(&html, files);
    let html = inline_images(&html, files);
    Some(strip_untyped_scripts(&html))
}

/// Replace local `<link href="*.css">` tags with `<style>` blocks.
pub fn inline_stylesheets(html: &str, files: &VirtualFileSet) -> String {
    link_regex()
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let href = &caps[1];
            if !is_stylesheet(tag, href) {
                return tag.to_string();
            }
            match resolve(files, href).and_then(|key| files.get(key)) {
                Some(css) => format!(
                    "<style>\n/* Inlined from {} */\n{}\n</style>",
                    href,
                    style_close_regex().replace_all(css, r"<\/style")
                ),
                None => tag.to_string(),
            }
        })
        .into_owned()
}

/// Replace local `<script src>` tags with inline scripts, keeping other attributes.
pub fn inline_scripts(html: &str, files: &VirtualFileSet) -> String {
    script_regex()
        .replace_all(html, |caps: &Captures| {
            let src = &caps[2];
            if has_extension(src, &["ts", "tsx"]) {
                return caps[0].to_string();
            }
            let content = resolve(files, src)
                .and_then(|key| files.get(key))
                .filter(|content| !is_data_url(content));
            match content {
                Some(js) => format!(
                    "<script{}{}>\n// Inlined from {}\n{}\n</script>",
                    caps[1].trim_end(),
                    &caps[3],
                    src,
                    script_close_regex().replace_all(js, r"<\/script")
                ),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Point local `<img src>` at the file content, encoding SVG markup as a data URL.
pub fn inline_images(html: &str, files: &VirtualFileSet) -> String {
    img_regex()
        .replace_all(html, |caps: &Captures| {
            let src = &caps[2];
            let Some((key, content)) =
                resolve(files, src).and_then(|key| files.get(key).map(|c| (key, c)))
            else {
                return caps[0].to_string();
            };
            let value = if !is_data_url(content) && is_svg(key, content) {
                format!("data:image/svg+xml;base64,{}", BASE64.encode(content))
            } else {
                content.to_string()
            };
            format!("<img{} src=\"{}\"{}>", caps[1].trim_end(), value, &caps[3])
        })
        .into_owned()
}

/// Drop `<script src="*.ts|*.tsx">`: the preview cannot execute them.
pub fn strip_untyped_scripts(html: &str) -> String {
    let stripped = untyped_script_regex().find_iter(html).count();
    if stripped == 0 {
        return html.to_string();
    }
    debug!(stripped, "removed TypeScript script tags from preview");
    untyped_script_regex().replace_all(html, "").into_owned()
}

/// Insert the bridge script before `</head>`, or at the very start without one.
pub fn inject_instrumentation(html: &str) -> String {
    match head_close_regex().find(html) {
        Some(close) => {
            let mut out = String::with_capacity(html.len() + INSTRUMENTATION_SCRIPT.len());
            out.push_str(&html[..close.start()]);
            out.push_str(INSTRUMENTATION_SCRIPT);
            out.push_str(&html[close.start()..]);
            out
        }
        None => format!("{}{}", INSTRUMENTATION_SCRIPT, html),
    }
}

fn is_stylesheet(tag: &str, href: &str) -> bool {
    has_extension(href, &["css"]) || tag.to_ascii_lowercase().contains("stylesheet")
}

fn has_extension(reference: &str, extensions: &[&str]) -> bool {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    path.rsplit_once('.')
        .map(|(_, ext)| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn is_svg(key: &str, content: &str) -> bool {
    if has_extension(key, &["svg"]) {
        return true;
    }
    let head = content.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}
