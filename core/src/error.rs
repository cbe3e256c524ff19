//! Error types for the synchronization core

/// Errors surfaced by loading, decoding and playback operations.
///
/// Only playback-start failures reach callers of `play`. Configuration
/// loading degrades to the bundled fallback, and mouth-parameter resets log
/// and swallow their errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Asset could not be fetched
    #[error("failed to fetch '{location}': {reason}")]
    Fetch { location: String, reason: String },

    /// Encoded audio could not be decoded
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Playback was requested without decodable audio
    #[error("no decoded audio available for playback")]
    NoAudio,

    /// Analysis engine start-up or session creation failed
    #[error("analysis engine error: {0}")]
    Engine(String),

    /// Sync configuration or settings document is malformed
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Host audio backend refused an operation
    #[error("audio backend error: {0}")]
    Backend(String),

    /// Mouth parameter indices could not be resolved
    #[error("cannot resolve mouth parameters: {0}")]
    MouthParameters(String),
}

impl SyncError {
    pub(crate) fn fetch(location: &str, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
