//! voicechat - voice chat sessions with cloned-voice replies
//!
//! A user submits text, an LLM answers in the selected language, and the
//! answer is rendered as speech in the voice of a captured reference sample.
//! Both land in an ordered history that can be rewound one exchange at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              Adapters                         │
//! │     Terminal REPL   │   HTTP API (axum)       │
//! └─────────────────────┬────────────────────────┘
//!                       │ commands
//! ┌─────────────────────▼────────────────────────┐
//! │   Session: history  │  language/voice config  │
//! └─────────────────────┬────────────────────────┘
//!                       │ submit
//! ┌─────────────────────▼────────────────────────┐
//! │   TurnSynthesisPipeline                       │
//! │   TextGenerator ──▶ SpeechSynthesizer         │
//! │   (Gemini)           (Chatterbox server)      │
//! └──────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod repl;
pub mod session;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{
    GenerationParams, SpeechSynthesizer, TextGenerator, TurnSynthesisPipeline,
    compose_instruction,
};
pub use providers::{ChatterboxClient, GeminiGenerator};
pub use session::{
    ConversationHistory, FailurePolicy, LanguageCatalog, LanguageConfig, ReferenceAudio, Role,
    Session, Turn,
};
pub use voice::Waveform;
