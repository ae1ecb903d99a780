//! Turn synthesis: prompt → reply text → rendered speech
//!
//! The pipeline is a stateless transform over its inputs. It never touches the
//! conversation history; the session appends the turn it returns.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::session::{LanguageConfig, Turn};
use crate::voice::Waveform;
use crate::{Error, Result};

/// Advisory reply length passed to the text generator, never enforced locally
pub const MAX_REPLY_CHARS: usize = 300;

/// Sampling hints forwarded with every generation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

/// External text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a reply for the instruction
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] on authentication, quota, or transport failure
    async fn generate(&self, instruction: &str, params: GenerationParams) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// External speech-synthesis capability
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render text in the voice of the reference sample
    ///
    /// # Errors
    ///
    /// Returns [`Error::Synthesis`] if the model is unloaded, the reference is
    /// unreadable, or the language code is unsupported
    async fn synthesize(
        &self,
        text: &str,
        reference_audio: &Path,
        language_code: &str,
    ) -> Result<Waveform>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Instruction sent to the text generator: the raw prompt plus a language and
/// length directive
#[must_use]
pub fn compose_instruction(prompt: &str, language_code: &str) -> String {
    format!(
        "{prompt}\nplease answer {language_code}, and keep it short, under {MAX_REPLY_CHARS} characters"
    )
}

/// Orchestrates one submission across the two capabilities
#[derive(Clone)]
pub struct TurnSynthesisPipeline {
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    params: GenerationParams,
}

impl TurnSynthesisPipeline {
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        params: GenerationParams,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            params,
        }
    }

    /// Turn a user prompt into a fully synthesized assistant turn
    ///
    /// Issues exactly one generation call followed by exactly one synthesis
    /// call. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyPrompt`] or [`Error::Config`] before any external call
    /// - [`Error::Service`] if text generation fails
    /// - [`Error::Synthesis`] if speech synthesis fails, carrying the reply text
    pub async fn process_submission(
        &self,
        prompt: &str,
        language: &LanguageConfig,
    ) -> Result<Turn> {
        if prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }
        let reference = language.require_reference()?;
        let code = language.language_code();

        let instruction = compose_instruction(prompt, code);
        tracing::debug!(
            generator = self.generator.name(),
            language = code,
            "generating reply"
        );
        let response_text = self
            .generator
            .generate(&instruction, self.params)
            .await
            .map_err(|e| match e {
                Error::Service(_) => e,
                other => Error::Service(other.to_string()),
            })?;

        tracing::debug!(
            synthesizer = self.synthesizer.name(),
            chars = response_text.chars().count(),
            "synthesizing reply"
        );
        let audio = match self
            .synthesizer
            .synthesize(&response_text, reference, code)
            .await
        {
            Ok(audio) => audio,
            Err(Error::Synthesis { reason, .. }) => {
                return Err(Error::Synthesis {
                    reason,
                    response_text: Some(response_text),
                });
            }
            Err(other) => {
                return Err(Error::Synthesis {
                    reason: other.to_string(),
                    response_text: Some(response_text),
                });
            }
        };

        tracing::info!(
            language = code,
            seconds = audio.duration_secs(),
            "assistant turn synthesized"
        );
        Ok(Turn::assistant(response_text, Some(audio)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_carries_prompt_and_directive() {
        let instruction = compose_instruction("안녕", "ko");
        assert!(instruction.starts_with("안녕\n"));
        assert!(instruction.contains("please answer ko"));
        assert!(instruction.contains("under 300 characters"));
    }

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert!(params.temperature.abs() < f32::EPSILON);
        assert_eq!(params.max_tokens, 1024);
    }
}
