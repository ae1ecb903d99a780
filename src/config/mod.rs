//! Configuration management for voicechat
//!
//! Layered: built-in defaults, then the TOML file, then environment variables.
//! CLI flags are applied on top by the binary.

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::pipeline::GenerationParams;
use crate::session::FailurePolicy;

pub use file::{ConfigFile, config_file_path, load_config_file};

/// voicechat configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Text generation settings
    pub llm: LlmConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// Session defaults
    pub session: SessionConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Path to data directory (captured reference samples)
    pub data_dir: PathBuf,
}

/// Text generation configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Gemini API key (from `GEMINI_API_KEY` or `GOOGLE_API_KEY`)
    pub api_key: Option<SecretString>,

    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,

    pub timeout_secs: u64,

    /// API base URL override
    pub endpoint: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 120,
            endpoint: None,
        }
    }
}

/// Speech synthesis server configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Base URL of the Chatterbox TTS server
    pub url: String,

    /// Device the model is loaded on
    pub device: String,

    /// Request timeout in seconds; synthesis on CPU is slow
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8004".to_string(),
            device: "cpu".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Session defaults
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Initial language label; first selectable label when unset
    pub language: Option<String>,

    /// Reference voice sample to start with
    pub reference_audio: Option<PathBuf>,

    /// Render audio players alongside assistant turns
    pub show_audio: bool,

    pub failure_policy: FailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: None,
            reference_audio: None,
            show_audio: true,
            failure_policy: FailurePolicy::Keep,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self { port: 18790 }
    }
}

/// Parse a boolean flag the way env vars are usually written
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Look up and parse an environment value, ignoring malformed input
fn env_parse<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from the config file and the process environment
    #[must_use]
    pub fn load() -> Self {
        let file = load_config_file();
        let data_dir = directories::ProjectDirs::from("dev", "voicechat", "voicechat")
            .map_or_else(|| PathBuf::from(".voicechat"), |d| d.data_dir().to_path_buf());

        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            tracing::warn!(
                path = %data_dir.display(),
                error = %e,
                "failed to create data directory"
            );
        }

        Self::from_sources(file, data_dir, |key| std::env::var(key).ok())
    }

    /// Merge defaults, a parsed config file and an environment lookup
    pub fn from_sources(
        file: ConfigFile,
        data_dir: PathBuf,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = LlmConfig::default();
        let llm = LlmConfig {
            api_key: env("GEMINI_API_KEY")
                .or_else(|| env("GOOGLE_API_KEY"))
                .or(file.llm.api_key)
                .map(SecretString::from),
            model: env("VOICECHAT_LLM_MODEL")
                .or(file.llm.model)
                .unwrap_or(defaults.model),
            temperature: env_parse(&env, "VOICECHAT_LLM_TEMPERATURE")
                .or(file.llm.temperature)
                .unwrap_or(defaults.temperature),
            max_tokens: env_parse(&env, "VOICECHAT_LLM_MAX_TOKENS")
                .or(file.llm.max_tokens)
                .unwrap_or(defaults.max_tokens),
            timeout_secs: env_parse(&env, "VOICECHAT_LLM_TIMEOUT")
                .or(file.llm.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
            endpoint: env("VOICECHAT_LLM_ENDPOINT").or(file.llm.endpoint),
        };

        let defaults = TtsConfig::default();
        let tts = TtsConfig {
            url: env("VOICECHAT_TTS_URL")
                .or(file.tts.url)
                .unwrap_or(defaults.url),
            device: env("VOICECHAT_TTS_DEVICE")
                .or(file.tts.device)
                .unwrap_or(defaults.device),
            timeout_secs: env_parse(&env, "VOICECHAT_TTS_TIMEOUT")
                .or(file.tts.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
        };

        let env_policy = env("VOICECHAT_FAILURE_POLICY").map(|v| v.parse::<FailurePolicy>());
        let failure_policy = match env_policy {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "ignoring VOICECHAT_FAILURE_POLICY");
                file.session.failure_policy.unwrap_or_default()
            }
            None => file.session.failure_policy.unwrap_or_default(),
        };

        let session = SessionConfig {
            language: env("VOICECHAT_LANGUAGE").or(file.session.language),
            reference_audio: env("VOICECHAT_REFERENCE_AUDIO")
                .map(PathBuf::from)
                .or(file.session.reference_audio),
            show_audio: env("VOICECHAT_SHOW_AUDIO")
                .and_then(|v| parse_flag(&v))
                .or(file.session.show_audio)
                .unwrap_or(true),
            failure_policy,
        };

        let api_server = ApiServerConfig {
            port: env_parse(&env, "VOICECHAT_PORT")
                .or_else(|| env_parse(&env, "PORT"))
                .or(file.server.port)
                .unwrap_or_else(|| ApiServerConfig::default().port),
        };

        Self {
            llm,
            tts,
            session,
            api_server,
            data_dir,
        }
    }

    /// Sampling hints for the text generator
    #[must_use]
    pub const fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
        }
    }

    /// Where captured reference samples are written
    #[must_use]
    pub fn reference_audio_path(&self) -> PathBuf {
        self.data_dir.join("reference.wav")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load_with(file: &str, vars: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_sources(
            file::parse_config_file(file).unwrap(),
            PathBuf::from("/tmp/voicechat"),
            |key| env.get(key).cloned(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = load_with("", &[]);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.tts.device, "cpu");
        assert!(config.session.show_audio);
        assert_eq!(config.session.failure_policy, FailurePolicy::Keep);
        assert_eq!(config.api_server.port, 18790);
        assert_eq!(
            config.reference_audio_path(),
            PathBuf::from("/tmp/voicechat/reference.wav")
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let config = load_with(
            "[llm]\nmodel = \"from-file\"\nmax_tokens = 256\n[tts]\ndevice = \"cuda\"",
            &[
                ("VOICECHAT_LLM_MODEL", "from-env"),
                ("GEMINI_API_KEY", "secret"),
                ("VOICECHAT_SHOW_AUDIO", "off"),
            ],
        );
        assert_eq!(config.llm.model, "from-env");
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.tts.device, "cuda");
        assert!(!config.session.show_audio);
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("secret".to_string())
        );
    }

    #[test]
    fn test_invalid_env_values_fall_back() {
        let config = load_with(
            "[session]\nfailure_policy = \"retract\"",
            &[
                ("VOICECHAT_PORT", "not-a-port"),
                ("VOICECHAT_FAILURE_POLICY", "undo"),
            ],
        );
        assert_eq!(config.api_server.port, 18790);
        assert_eq!(config.session.failure_policy, FailurePolicy::Retract);
    }

    #[test]
    fn test_generation_params() {
        let config = load_with("", &[("VOICECHAT_LLM_TEMPERATURE", "0.7")]);
        let params = config.generation_params();
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(params.max_tokens, 1024);
    }
}
