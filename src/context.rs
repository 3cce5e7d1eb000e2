//! Prompt and context construction for the next model turn.

use crate::bridge::SandboxBridge;
use crate::config::{EditMode, Settings};
use crate::files::{is_data_url, VirtualFileSet};
use crate::parser::{thought, ParsedResponse};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

const BASE_PROMPT: &str = r#"You are VibeCoder, an expert frontend engineer.
You generate strictly valid HTML/JS/CSS. No .tsx, no .ts, no Markdown explanations outside of comments.

ARCHITECTURE:
- Entry point: index.html
- PREFER separating logic into 'script.js' and styles into 'styles.css' (or 'app.js'/'app.css').
- Do NOT dump complex logic into index.html unless it is a very simple single-file prototype.
- Use standard ES6 Modules (<script type="module">) if beneficial.
"#;

const FORMAT_PROMPT: &str = r#"OUTPUT FORMATS:

1. <thinking>...</thinking>
   (Explain your plan. Decide between PATCH or REWRITE.)

2. <!-- filename: path/to/file.ext -->
   (Followed by full file content. Use this for NEW files or REWRITES.)

3. <!-- patch: path/to/file.ext -->
   <<<<
   (Exact code block to replace - must match file content character-by-character including whitespace)
   ====
   (New code block)
   >>>>

RULES:
- Do not use `npm` or `import` from node_modules. Use CDNs (React, Tailwind) if requested.
- For patches, the '<<<<' block must be UNIQUE in the file. Include 2-3 lines of context.
- If you are unsure about the context for a patch, REWRITE the file.
"#;

pub fn system_prompt(mode: EditMode) -> String {
    let (label, directive) = match mode {
        EditMode::Auto => (
            "AUTO",
            "DECIDE: Use PATCH for small changes (<20 lines). Use FULL FILE for new files or complex refactors.",
        ),
        EditMode::Rewrite => ("REWRITE", "ALWAYS REWRITE FULL FILES."),
        EditMode::Patch => ("PATCH", "ALWAYS USE PATCHES FOR EXISTING FILES."),
    };
    format!(
        "{}\nCURRENT MODE: {}\n{}\n\n{}",
        BASE_PROMPT, label, directive, FORMAT_PROMPT
    )
}

/// Every file in the same marker format the model is asked to answer in.
///
/// Binary assets are listed by name only.
pub fn render_files(files: &VirtualFileSet) -> String {
    files
        .iter()
        .map(|(path, content)| {
            if is_data_url(content) {
                format!("<!-- filename: {} -->\n[binary asset omitted]", path)
            } else {
                format!("<!-- filename: {} -->\n{}", path, content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Context message for a request. Consumes the bridge's pending runtime error.
pub fn build_context(files: &VirtualFileSet, user_request: &str, bridge: &mut SandboxBridge) -> String {
    let mut context = format!(
        "CURRENT FILES:\n{}\n\nUSER REQUEST: {}",
        render_files(files),
        user_request
    );

    if let Some(err) = bridge.take_error() {
        let _ = write!(
            context,
            "\n\n!!! DETECTED RUNTIME ERROR IN PREVIEW !!!\nError: {}\nPLEASE FIX THIS ERROR.",
            err
        );
    }

    let mut selections = bridge.selections().peekable();
    if selections.peek().is_some() {
        context.push_str("\n\nSELECTED ELEMENTS (the user pointed at these in the preview):");
        for sel in selections {
            let _ = write!(
                context,
                "\n- <{}> \"{}\" at ({:.0}, {:.0}) {:.0}x{:.0}",
                sel.selector(),
                sel.text,
                sel.rect.x,
                sel.rect.y,
                sel.rect.width,
                sel.rect.height
            );
        }
    }

    context
}

/// System prompt, context, then the most recent history ending with the new request.
pub fn build_request_messages(
    settings: &Settings,
    files: &VirtualFileSet,
    history: &[ChatMessage],
    user_request: &str,
    bridge: &mut SandboxBridge,
) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage::new(Role::System, system_prompt(settings.mode)),
        ChatMessage::new(Role::System, build_context(files, user_request, bridge)),
    ];

    let keep_history = settings.history_window.saturating_sub(1).min(history.len());
    messages.extend_from_slice(&history[history.len() - keep_history..]);
    if settings.history_window > 0 {
        messages.push(ChatMessage::new(Role::User, user_request));
    }

    messages
}

/// The assistant message recorded in the chat after a turn.
pub fn assistant_transcript(parsed: &ParsedResponse, full_text: &str) -> String {
    match &parsed.thought {
        Some(plan) => {
            let (_, rest) = thought::extract(full_text);
            format!("**Plan:** {}\n\n{}", plan, rest.trim())
        }
        None => full_text.to_string(),
    }
}
