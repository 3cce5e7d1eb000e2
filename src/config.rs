use crate::bridge::DEFAULT_SELECTION_CAPACITY;
use crate::context::ChatMessage;
use crate::error::{VibeError, VibeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How the model is told to express changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Patches for small edits, full files otherwise.
    #[default]
    Auto,
    /// Always rewrite whole files.
    Rewrite,
    /// Always patch existing files.
    Patch,
}

/// User settings, typically loaded from `vibecoder.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// OpenAI-compatible base URL (with or without `/v1`).
    pub api_url: String,
    pub model: String,
    pub mode: EditMode,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Most recent chat messages sent with each request.
    pub history_window: usize,
    /// Most recent point selections kept by the bridge.
    pub selection_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            mode: EditMode::Auto,
            temperature: 0.7,
            max_tokens: 32000,
            history_window: 6,
            selection_capacity: DEFAULT_SELECTION_CAPACITY,
        }
    }
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> VibeResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> VibeResult<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| VibeError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// `api_url` without `/chat/completions`, `/v1` or a trailing slash.
    pub fn base_url(&self) -> &str {
        let url = self.api_url.trim().trim_end_matches('/');
        let url = url.strip_suffix("/chat/completions").unwrap_or(url);
        let url = url.strip_suffix("/v1").unwrap_or(url);
        url.trim_end_matches('/')
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url())
    }

    pub fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url())
    }

    /// Streaming chat-completions body for the transport to send.
    pub fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings = Settings::from_yaml_str("model: qwen2.5-coder\nmode: patch\n").unwrap();
        assert_eq!(settings.model, "qwen2.5-coder");
        assert_eq!(settings.mode, EditMode::Patch);
        assert_eq!(settings.api_url, "http://localhost:1234/v1");
        assert_eq!(settings.history_window, 6);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml_str("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_mode_is_config_error() {
        let err = Settings::from_yaml_str("mode: yolo").unwrap_err();
        assert!(matches!(err, VibeError::ConfigDecode(_)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Settings::load("/definitely/not/here/vibecoder.yaml").unwrap_err();
        assert!(matches!(err, VibeError::ConfigRead { .. }));
    }

    #[test]
    fn test_url_normalisation() {
        let mut settings = Settings::default();
        for api_url in [
            "http://localhost:1234/v1",
            "http://localhost:1234/v1/",
            "http://localhost:1234/v1/chat/completions",
            "http://localhost:1234",
        ] {
            settings.api_url = api_url.to_string();
            assert_eq!(
                settings.chat_completions_url(),
                "http://localhost:1234/v1/chat/completions"
            );
            assert_eq!(settings.models_url(), "http://localhost:1234/v1/models");
        }
    }

    #[test]
    fn test_request_body() {
        let settings = Settings::default();
        let body = settings.request_body(&[ChatMessage::new(Role::User, "hi")]);
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "local-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 32000);
    }
}
