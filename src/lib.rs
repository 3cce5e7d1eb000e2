//! # VibeCoder core
//!
//! Turns the free-form output of a code-generating model into a runnable,
//! sandboxed web preview.
//!
//! ## Pipeline
//! - [`stream`]: incremental decoding of the streamed response (thinking vs. content)
//! - [`parser`]: tiered recovery of full files and patch instructions
//! - [`patch`]: anchor-based patching of the [`VirtualFileSet`]
//! - [`resolver`]: tolerant mapping of HTML asset references to file-set keys
//! - [`preview`]: self-contained, instrumented preview documents with one live handle
//! - [`bridge`]: runtime errors and point selections coming back from the preview
//! - [`context`] / [`turn`]: feeding all of that into the next conversation turn
//!
//! ## Example
//! ```ignore
//! use vibecoder_core::{apply_response, render_preview, VirtualFileSet};
//!
//! let files: VirtualFileSet = [("script.js", "console.log(\"old\")")].into_iter().collect();
//! let response = "<!-- patch: script.js -->\n<<<<\nconsole.log(\"old\")\n====\nconsole.log(\"new\")\n>>>>";
//!
//! let (parsed, outcome) = apply_response(&files, response);
//! assert!(parsed.thought.is_none());
//! assert_eq!(outcome.files.get("script.js"), Some("console.log(\"new\")"));
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod parser;
pub mod patch;
pub mod preview;
pub mod resolver;
pub mod setup;
pub mod stream;
pub mod turn;

// --- Core types ---
pub use bridge::{
    BridgeMessage, HostCommand, PointSelection, RuntimeError, SandboxBridge, SandboxEvent,
};
pub use config::{EditMode, Settings};
pub use error::{VibeError, VibeResult};
pub use files::{VirtualFileSet, ENTRY_FILE};
pub use parser::{ParseTier, ParsedResponse};
pub use patch::{PatchBlock, PatchOutcome, PatchWarning};
pub use preview::{DocumentRegistry, PreviewHandle, PreviewSession, PreviewSlot};
pub use stream::{StreamDecoder, StreamPhase, StreamView};
pub use turn::{Project, TurnOutcome};

/// Parse a finished model response.
pub fn parse_response(text: &str) -> ParsedResponse {
    parser::parse_response(text)
}

/// Apply patch instructions to `files`.
pub fn apply_patches(
    files: &VirtualFileSet,
    patches: &std::collections::BTreeMap<String, String>,
) -> PatchOutcome {
    patch::apply_patches(files, patches)
}

/// Parse `response` and merge it into `files` (full files win over patches).
pub fn apply_response(files: &VirtualFileSet, response: &str) -> (ParsedResponse, PatchOutcome) {
    let parsed = parser::parse_response(response);
    let outcome = patch::merge_turn(files, &parsed);
    (parsed, outcome)
}

/// Resolve an asset reference against the file set.
pub fn resolve_asset<'a>(files: &'a VirtualFileSet, reference: &str) -> Option<&'a str> {
    resolver::resolve(files, reference)
}

/// Assemble the preview document without issuing a handle.
pub fn render_preview(files: &VirtualFileSet) -> Option<String> {
    preview::assemble_document(files)
}
