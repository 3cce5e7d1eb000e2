use thiserror::Error;

pub type VibeResult<T> = Result<T, VibeError>;

/// Failures that surface at the turn or process level.
///
/// Parsing, patching and asset resolution never produce these: malformed
/// model output degrades to an empty result instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VibeError {
    #[error("Failed to read config '{path}': {message}")]
    ConfigRead { path: String, message: String },

    #[error("Invalid config: {0}")]
    ConfigDecode(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Turn aborted before the stream completed")]
    Aborted,

    #[error("Invalid bridge message: {0}")]
    BridgeDecode(String),

    #[error("No index.html in {0} to preview")]
    MissingEntry(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_yaml::Error> for VibeError {
    fn from(err: serde_yaml::Error) -> Self {
        VibeError::ConfigDecode(err.to_string())
    }
}

impl From<serde_json::Error> for VibeError {
    fn from(err: serde_json::Error) -> Self {
        VibeError::BridgeDecode(err.to_string())
    }
}

impl From<std::io::Error> for VibeError {
    fn from(err: std::io::Error) -> Self {
        VibeError::Io(err.to_string())
    }
}
