//! TOML configuration file loading
//!
//! Supports `~/.config/voicechat/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::session::FailurePolicy;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Text generation settings
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech synthesis settings
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Session defaults
    #[serde(default)]
    pub session: SessionFileConfig,

    /// HTTP API settings
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gemini-2.5-flash")
    pub model: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// API base URL override
    pub endpoint: Option<String>,
}

/// Speech synthesis server configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// Base URL of the TTS server
    pub url: Option<String>,

    /// Device the model is loaded on ("cpu", "cuda", "mps")
    pub device: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Session defaults
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Initial language label (e.g. "Korean")
    pub language: Option<String>,

    /// Reference voice sample to start with
    pub reference_audio: Option<PathBuf>,

    /// Render audio players alongside assistant turns
    pub show_audio: Option<bool>,

    /// "keep" or "retract"
    pub failure_policy: Option<FailurePolicy>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed
pub fn parse_config_file(content: &str) -> crate::Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voicechat/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voicechat").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file() {
        let file = parse_config_file(
            r#"
            [llm]
            model = "gemini-2.0-flash"

            [session]
            language = "Korean"
            failure_policy = "retract"
            "#,
        )
        .unwrap();

        assert_eq!(file.llm.model.as_deref(), Some("gemini-2.0-flash"));
        assert!(file.llm.api_key.is_none());
        assert_eq!(file.session.language.as_deref(), Some("Korean"));
        assert_eq!(file.session.failure_policy, Some(FailurePolicy::Retract));
        assert!(file.tts.url.is_none());
        assert!(file.server.port.is_none());
    }

    #[test]
    fn test_empty_file() {
        let file = parse_config_file("").unwrap();
        assert!(file.llm.model.is_none());
        assert!(file.session.show_audio.is_none());
    }

    #[test]
    fn test_bad_policy_rejected() {
        assert!(parse_config_file("[session]\nfailure_policy = \"undo\"").is_err());
    }
}
