//! One conversation turn: stream → parse → patch → publish.
//!
//! The project's file set lives in a `watch` channel so observers always see
//! either the set from before a turn or the complete set after it. Aborted or
//! failed streams never reach the parser and leave the set untouched.

use crate::context::assistant_transcript;
use crate::error::{VibeError, VibeResult};
use crate::files::VirtualFileSet;
use crate::parser::{parse_response, ParsedResponse};
use crate::patch::{merge_turn, PatchWarning};
use crate::stream::{StreamDecoder, StreamView};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

/// Host side of a turn's cancellation.
#[derive(Debug)]
pub struct AbortHandle(oneshot::Sender<()>);

impl AbortHandle {
    pub fn abort(self) {
        let _ = self.0.send(());
    }
}

/// Turn side of a turn's cancellation. Dropping the handle does not abort.
#[derive(Debug)]
pub struct AbortSignal(oneshot::Receiver<()>);

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = oneshot::channel();
    (AbortHandle(tx), AbortSignal(rx))
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub parsed: ParsedResponse,
    pub warnings: Vec<PatchWarning>,
    /// Assistant message to append to the chat.
    pub transcript: String,
    /// Whether a new file set was published.
    pub published: bool,
}

/// Owner of the published file set.
#[derive(Debug)]
pub struct Project {
    files: watch::Sender<Arc<VirtualFileSet>>,
}

impl Project {
    pub fn new(files: VirtualFileSet) -> Self {
        let (files, _) = watch::channel(Arc::new(files));
        Self { files }
    }

    pub fn snapshot(&self) -> Arc<VirtualFileSet> {
        Arc::clone(&self.files.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<VirtualFileSet>> {
        self.files.subscribe()
    }

    /// Publish a whole new set, e.g. after a manual edit in the host.
    pub fn replace(&self, files: VirtualFileSet) {
        self.files.send_replace(Arc::new(files));
    }

    /// Drive a turn to completion.
    ///
    /// `progress` receives a [`StreamView`] after every fragment.
    pub async fn run_turn<S>(
        &self,
        mut fragments: S,
        abort: AbortSignal,
        progress: Option<&mpsc::UnboundedSender<StreamView>>,
    ) -> VibeResult<TurnOutcome>
    where
        S: Stream<Item = VibeResult<String>> + Unpin,
    {
        let AbortSignal(mut abort) = abort;
        let mut abort_live = true;
        let mut decoder = StreamDecoder::new();

        loop {
            tokio::select! {
                biased;
                signal = &mut abort, if abort_live => {
                    if signal.is_ok() {
                        info!(received = decoder.text().len(), "turn aborted; discarding partial response");
                        return Err(VibeError::Aborted);
                    }
                    abort_live = false;
                }
                next = fragments.next() => match next {
                    Some(Ok(fragment)) => {
                        let view = decoder.push(&fragment);
                        if let Some(progress) = progress {
                            let _ = progress.send(view);
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "stream failed; file set left unchanged");
                        return Err(err);
                    }
                    None => break,
                },
            }
        }

        let text = decoder.finish();
        Ok(self.complete(&text))
    }

    /// Apply a fully received response.
    pub fn complete(&self, text: &str) -> TurnOutcome {
        let parsed = parse_response(text);
        let current = self.snapshot();
        let merged = merge_turn(&current, &parsed);

        let published = !merged.files.is_empty() && merged.files != *current;
        if published {
            info!(
                files = merged.files.len(),
                replaced = parsed.files.len(),
                patched = merged.applied,
                "publishing updated file set"
            );
            self.files.send_replace(Arc::new(merged.files));
        }

        TurnOutcome {
            transcript: assistant_transcript(&parsed, text),
            warnings: merged.warnings,
            parsed,
            published,
        }
    }
}
