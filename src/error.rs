//! Error types for voicechat

use thiserror::Error;

/// Result type alias for voicechat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in a voice chat session
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing reference audio, unknown language, bad settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech model could not be loaded; fatal for the session
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Text generation service error (auth, quota, transport)
    #[error("text generation error: {0}")]
    Service(String),

    /// Speech synthesis error
    ///
    /// Carries the already generated reply when synthesis failed after
    /// text generation succeeded
    #[error("synthesis error: {reason}")]
    Synthesis {
        reason: String,
        response_text: Option<String>,
    },

    /// Submitted prompt was empty
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Audio device or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Build a synthesis error with no reply text attached
    pub fn synthesis(reason: impl Into<String>) -> Self {
        Self::Synthesis {
            reason: reason.into(),
            response_text: None,
        }
    }

    /// Reply text that was generated before the failure, if any
    #[must_use]
    pub fn response_text(&self) -> Option<&str> {
        match self {
            Self::Synthesis { response_text, .. } => response_text.as_deref(),
            _ => None,
        }
    }
}
