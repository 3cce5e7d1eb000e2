//! Incremental decoding of a streamed model response.
//!
//! The transport hands over raw server-sent-event chunks; [`SseDecoder`] turns
//! them into content deltas and [`StreamDecoder`] tracks the `<thinking>` span
//! so the host can show either status commentary or the code being written.

use serde::Serialize;

pub const THINKING_OPEN: &str = "<thinking>";
pub const THINKING_CLOSE: &str = "</thinking>";

/// Number of trailing thinking characters surfaced as status text.
const STATUS_TAIL_CHARS: usize = 50;

/// Where the model currently is in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// Nothing but whitespace (or a partial `<thinking>` tag) received so far.
    Waiting,
    /// Inside an unterminated thinking span.
    Thinking,
    /// Thinking span closed, or content arrived without one.
    Generating,
}

/// Snapshot exposed to the host after every fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamView {
    pub phase: StreamPhase,
    /// Thinking text while thinking; post-thinking content otherwise.
    pub visible: String,
    /// One-line status suitable for a status bar.
    pub status: String,
}

/// Accumulates fragments and classifies the cumulative text.
///
/// Only the first `<thinking>` and the first `</thinking>` after it are
/// considered; repeated or nested spans are treated as ordinary content.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    text: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the updated view.
    pub fn push(&mut self, fragment: &str) -> StreamView {
        self.text.push_str(fragment);
        self.view()
    }

    /// Cumulative text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the decoder, yielding the full response text.
    pub fn finish(self) -> String {
        self.text
    }

    pub fn phase(&self) -> StreamPhase {
        self.view().phase
    }

    pub fn view(&self) -> StreamView {
        let text = self.text.as_str();

        if let Some(open) = text.find(THINKING_OPEN) {
            let inner_start = open + THINKING_OPEN.len();
            match text[inner_start..].find(THINKING_CLOSE) {
                None => {
                    let thinking = &text[inner_start..];
                    return StreamView {
                        phase: StreamPhase::Thinking,
                        visible: thinking.to_string(),
                        status: tail_chars(thinking, STATUS_TAIL_CHARS).to_string(),
                    };
                }
                Some(rel_close) => {
                    let close_end = inner_start + rel_close + THINKING_CLOSE.len();
                    let mut visible = String::with_capacity(text.len());
                    visible.push_str(&text[..open]);
                    visible.push_str(&text[close_end..]);
                    return generating(visible.trim_start().to_string());
                }
            }
        }

        let trimmed = text.trim_start();
        if trimmed.is_empty() || THINKING_OPEN.starts_with(trimmed) {
            return StreamView {
                phase: StreamPhase::Waiting,
                visible: String::new(),
                status: "Contacting model...".to_string(),
            };
        }

        generating(trimmed.to_string())
    }
}

fn generating(visible: String) -> StreamView {
    StreamView {
        phase: StreamPhase::Generating,
        visible,
        status: "Writing code...".to_string(),
    }
}

fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    let (idx, _) = s.char_indices().nth(skip).unwrap_or((0, ' '));
    &s[idx..]
}

/// Extracts `choices[0].delta.content` from an OpenAI-style event stream.
///
/// Chunks may split lines arbitrarily; incomplete lines are buffered until
/// their newline arrives. Malformed events are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let mut deltas = Vec::new();

        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            if let Some(delta) = decode_line(&line) {
                deltas.push(delta);
            }
        }

        deltas
    }

    /// Flush a trailing line that never received its newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(line: &str) -> Option<String> {
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    let event: serde_json::Value = serde_json::from_str(payload).ok()?;
    let content = event
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;

    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_content_is_generating() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.push("  ").phase, StreamPhase::Waiting);

        let view = decoder.push("<!-- filename: index.html -->");
        assert_eq!(view.phase, StreamPhase::Generating);
        assert_eq!(view.visible, "<!-- filename: index.html -->");
        assert_eq!(view.status, "Writing code...");
    }

    #[test]
    fn test_thinking_span_lifecycle() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.push("<think").phase, StreamPhase::Waiting);

        let view = decoder.push("ing>Plan the layout");
        assert_eq!(view.phase, StreamPhase::Thinking);
        assert_eq!(view.visible, "Plan the layout");
        assert_eq!(view.status, "Plan the layout");

        let view = decoder.push("</thinking>\n<!-- filename: a.css -->");
        assert_eq!(view.phase, StreamPhase::Generating);
        assert_eq!(view.visible, "<!-- filename: a.css -->");
    }

    #[test]
    fn test_status_keeps_tail_of_long_thinking() {
        let mut decoder = StreamDecoder::new();
        let long = "x".repeat(80) + "END";
        let view = decoder.push(&format!("<thinking>{}", long));
        assert_eq!(view.status.chars().count(), 50);
        assert!(view.status.ends_with("END"));
    }

    #[test]
    fn test_only_first_span_counts() {
        let mut decoder = StreamDecoder::new();
        let view = decoder.push("<thinking>a</thinking>body<thinking>b");
        assert_eq!(view.phase, StreamPhase::Generating);
        assert_eq!(view.visible, "body<thinking>b");
    }

    #[test]
    fn test_finish_returns_full_text() {
        let mut decoder = StreamDecoder::new();
        decoder.push("<thinking>x</thinking>");
        decoder.push("rest");
        assert_eq!(decoder.finish(), "<thinking>x</thinking>rest");
    }

    #[test]
    fn test_sse_split_across_chunks() {
        let mut sse = SseDecoder::new();
        let first = sse.feed("data: {\"choices\":[{\"delta\":{\"content\":\"Hel");
        assert!(first.is_empty());

        let second = sse.feed("lo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n");
        assert_eq!(second, vec!["Hello".to_string(), " world".to_string()]);
    }

    #[test]
    fn test_sse_skips_done_and_garbage() {
        let mut sse = SseDecoder::new();
        let deltas = sse.feed(
            "data: not-json\n: keepalive\ndata: {\"choices\":[{\"delta\":{}}]}\ndata: [DONE]\n",
        );
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_sse_finish_flushes_unterminated_line() {
        let mut sse = SseDecoder::new();
        assert!(sse.feed("data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}").is_empty());
        assert_eq!(sse.finish(), Some("tail".to_string()));
    }
}
