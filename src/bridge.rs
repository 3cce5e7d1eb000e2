//! Message bridge between the sandboxed preview document and the host.
//!
//! The preview posts JSON messages to its parent (`iframe-error`,
//! `point-select`) and listens for `toggle-point-select`. On the Rust side
//! those shapes are [`BridgeMessage`]; the two directions travel over separate
//! typed channels so neither side ever touches the other's state.

use crate::error::VibeResult;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

pub const MSG_ERROR: &str = "iframe-error";
pub const MSG_POINT_SELECT: &str = "point-select";
pub const MSG_TOGGLE_POINT_SELECT: &str = "toggle-point-select";

/// Selections kept when no capacity is configured.
pub const DEFAULT_SELECTION_CAPACITY: usize = 5;

/// Uncaught error, rejected promise or `console.error` inside the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, " ({}:{})", source, line),
            (Some(source), None) => write!(f, " ({})", source),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An element the user clicked while point-select mode was on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSelection {
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub classes: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub rect: BoundingBox,
}

impl PointSelection {
    /// CSS-like label, e.g. `button#save.primary.large`.
    pub fn selector(&self) -> String {
        let mut label = self.tag.clone();
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            label.push('#');
            label.push_str(id);
        }
        for class in self.classes.split_whitespace() {
            label.push('.');
            label.push_str(class);
        }
        label
    }
}

/// Wire form of every message crossing the document boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BridgeMessage {
    IframeError(RuntimeError),
    PointSelect(PointSelection),
    TogglePointSelect { enabled: bool },
}

impl BridgeMessage {
    pub fn from_json(json: &str) -> VibeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> VibeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Sandbox → host.
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxEvent {
    RuntimeError(RuntimeError),
    PointSelected(PointSelection),
}

/// Host → sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    SetPointSelect(bool),
}

impl From<SandboxEvent> for BridgeMessage {
    fn from(event: SandboxEvent) -> Self {
        match event {
            SandboxEvent::RuntimeError(err) => BridgeMessage::IframeError(err),
            SandboxEvent::PointSelected(sel) => BridgeMessage::PointSelect(sel),
        }
    }
}

impl From<HostCommand> for BridgeMessage {
    fn from(command: HostCommand) -> Self {
        match command {
            HostCommand::SetPointSelect(enabled) => BridgeMessage::TogglePointSelect { enabled },
        }
    }
}

/// Host end: receives sandbox events, sends commands.
#[derive(Debug)]
pub struct HostPort {
    events: UnboundedReceiver<SandboxEvent>,
    commands: UnboundedSender<HostCommand>,
}

/// Sandbox end: posts events, receives commands.
#[derive(Debug)]
pub struct SandboxPort {
    events: UnboundedSender<SandboxEvent>,
    commands: UnboundedReceiver<HostCommand>,
    point_select: bool,
}

/// Create a connected pair of ports.
pub fn channel() -> (HostPort, SandboxPort) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    (
        HostPort {
            events: event_rx,
            commands: command_tx,
        },
        SandboxPort {
            events: event_tx,
            commands: command_rx,
            point_select: false,
        },
    )
}

impl HostPort {
    /// Fire-and-forget: a closed sandbox simply drops the command.
    pub fn send(&self, command: HostCommand) {
        let _ = self.commands.send(command);
    }

    pub async fn recv(&mut self) -> Option<SandboxEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SandboxEvent> {
        self.events.try_recv().ok()
    }
}

impl SandboxPort {
    /// Fire-and-forget: a closed host simply drops the event.
    pub fn post(&self, event: SandboxEvent) {
        let _ = self.events.send(event);
    }

    /// Decode a message posted by the preview document and forward it.
    ///
    /// A `toggle-point-select` echoed back by the document updates local mode.
    pub fn deliver_json(&mut self, json: &str) -> VibeResult<()> {
        match BridgeMessage::from_json(json)? {
            BridgeMessage::IframeError(err) => self.post(SandboxEvent::RuntimeError(err)),
            BridgeMessage::PointSelect(sel) => self.post(SandboxEvent::PointSelected(sel)),
            BridgeMessage::TogglePointSelect { enabled } => self.point_select = enabled,
        }
        Ok(())
    }

    /// Apply pending host commands; returns the wire messages to hand to the document.
    pub fn poll_commands(&mut self) -> Vec<BridgeMessage> {
        let mut delivered = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            let HostCommand::SetPointSelect(enabled) = command;
            self.point_select = enabled;
            delivered.push(BridgeMessage::from(command));
        }
        delivered
    }

    pub fn point_select_enabled(&self) -> bool {
        self.point_select
    }
}

/// Host-side advisory state fed into the next conversation turn.
#[derive(Debug, Clone)]
pub struct SandboxBridge {
    last_error: Option<RuntimeError>,
    selections: VecDeque<PointSelection>,
    capacity: usize,
    point_select: bool,
}

impl Default for SandboxBridge {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SELECTION_CAPACITY)
    }
}

impl SandboxBridge {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            last_error: None,
            selections: VecDeque::with_capacity(capacity),
            capacity,
            point_select: false,
        }
    }

    pub fn apply(&mut self, event: SandboxEvent) {
        match event {
            SandboxEvent::RuntimeError(err) => {
                debug!(message = %err.message, "preview runtime error");
                self.last_error = Some(err);
            }
            SandboxEvent::PointSelected(sel) => {
                debug!(selector = %sel.selector(), "preview point selection");
                if self.capacity == 0 {
                    return;
                }
                while self.selections.len() >= self.capacity {
                    self.selections.pop_front();
                }
                self.selections.push_back(sel);
            }
        }
    }

    /// Drain every event currently queued on `port`; returns how many were applied.
    pub fn pump(&mut self, port: &mut HostPort) -> usize {
        let mut applied = 0;
        while let Some(event) = port.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Accept a raw message from hosts that receive the document's JSON directly.
    pub fn ingest_json(&mut self, json: &str) -> VibeResult<()> {
        match BridgeMessage::from_json(json)? {
            BridgeMessage::IframeError(err) => self.apply(SandboxEvent::RuntimeError(err)),
            BridgeMessage::PointSelect(sel) => self.apply(SandboxEvent::PointSelected(sel)),
            BridgeMessage::TogglePointSelect { enabled } => self.point_select = enabled,
        }
        Ok(())
    }

    pub fn set_point_select(&mut self, port: &HostPort, enabled: bool) {
        self.point_select = enabled;
        port.send(HostCommand::SetPointSelect(enabled));
    }

    pub fn point_select_enabled(&self) -> bool {
        self.point_select
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    /// Hand the error to the next turn and forget it.
    pub fn take_error(&mut self) -> Option<RuntimeError> {
        self.last_error.take()
    }

    /// Oldest first.
    pub fn selections(&self) -> impl Iterator<Item = &PointSelection> {
        self.selections.iter()
    }

    pub fn clear_selections(&mut self) {
        self.selections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selection(tag: &str) -> PointSelection {
        PointSelection {
            tag: tag.to_string(),
            text: String::new(),
            classes: String::new(),
            id: None,
            rect: BoundingBox::default(),
        }
    }

    #[test]
    fn test_wire_shapes() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"iframe-error","message":"x is not defined","source":"about:srcdoc","line":3,"column":9}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            BridgeMessage::IframeError(RuntimeError {
                message: "x is not defined".into(),
                source: Some("about:srcdoc".into()),
                line: Some(3),
                column: Some(9),
            })
        );

        let toggle = BridgeMessage::TogglePointSelect { enabled: true }.to_json().unwrap();
        assert_eq!(toggle, r#"{"type":"toggle-point-select","enabled":true}"#);
    }

    #[test]
    fn test_point_select_decodes_with_missing_fields() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"point-select","tag":"button","classes":"btn primary","id":"save","rect":{"x":1,"y":2,"width":30,"height":10}}"#,
        )
        .unwrap();
        let BridgeMessage::PointSelect(sel) = msg else {
            panic!("Expected point selection");
        };
        assert_eq!(sel.text, "");
        assert_eq!(sel.selector(), "button#save.btn.primary");
        assert_eq!(sel.rect.width, 30.0);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(BridgeMessage::from_json(r#"{"type":"resize","w":1}"#).is_err());
    }

    #[test]
    fn test_last_error_overwrites() {
        let mut bridge = SandboxBridge::default();
        for message in ["first", "second"] {
            bridge.apply(SandboxEvent::RuntimeError(RuntimeError {
                message: message.into(),
                source: None,
                line: None,
                column: None,
            }));
        }
        assert_eq!(bridge.last_error().map(|e| e.message.as_str()), Some("second"));
        assert!(bridge.take_error().is_some());
        assert!(bridge.last_error().is_none());
    }

    #[test]
    fn test_selection_ring_buffer_drops_oldest() {
        let mut bridge = SandboxBridge::with_capacity(2);
        for tag in ["a", "b", "c"] {
            bridge.apply(SandboxEvent::PointSelected(selection(tag)));
        }
        let tags: Vec<&str> = bridge.selections().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["b", "c"]);

        bridge.clear_selections();
        assert_eq!(bridge.selections().count(), 0);
    }

    #[tokio::test]
    async fn test_channel_round_trip() {
        let (mut host, mut sandbox) = channel();
        let mut bridge = SandboxBridge::default();

        bridge.set_point_select(&host, true);
        let delivered = sandbox.poll_commands();
        assert_eq!(delivered, vec![BridgeMessage::TogglePointSelect { enabled: true }]);
        assert!(sandbox.point_select_enabled());

        sandbox
            .deliver_json(r#"{"type":"point-select","tag":"h1","text":"Title"}"#)
            .unwrap();
        sandbox.post(SandboxEvent::RuntimeError(RuntimeError {
            message: "boom".into(),
            source: Some("console.error".into()),
            line: None,
            column: None,
        }));

        let first = host.recv().await.unwrap();
        bridge.apply(first);
        assert_eq!(bridge.pump(&mut host), 1);

        assert_eq!(bridge.selections().next().map(|s| s.text.as_str()), Some("Title"));
        assert_eq!(
            bridge.last_error().map(|e| e.to_string()),
            Some("boom (console.error)".to_string())
        );
    }

    #[test]
    fn test_post_after_host_dropped_is_silent() {
        let (host, sandbox) = channel();
        drop(host);
        sandbox.post(SandboxEvent::PointSelected(selection("p")));
    }
}
