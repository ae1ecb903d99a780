//! Voice chat session state
//!
//! A [`Session`] owns the conversation history and the active language/voice
//! selection. Adapters (terminal, HTTP) drive it through explicit command
//! handlers; the synthesis pipeline is passed in per submission.

mod history;
mod language;

pub use history::{ConversationHistory, Role, Turn};
pub use language::{
    LanguageCatalog, LanguageConfig, RESERVED_CODE, ReferenceAudio, SUPPORTED_LANGUAGES,
};

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::pipeline::TurnSynthesisPipeline;
use crate::{Error, Result};

/// What to do with the user turn when its reply could not be produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the user turn in place, unpaired
    #[default]
    Keep,
    /// Remove the user turn so the history stays strictly paired
    Retract,
}

impl std::str::FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "retract" => Ok(Self::Retract),
            other => Err(Error::Config(format!("unknown failure policy: {other}"))),
        }
    }
}

/// One user's conversation and its synthesis settings
#[derive(Debug, Clone)]
pub struct Session {
    history: ConversationHistory,
    language: LanguageConfig,
    catalog: Arc<LanguageCatalog>,
    failure_policy: FailurePolicy,
}

impl Session {
    /// Start an empty session with the given language selected
    ///
    /// # Errors
    ///
    /// Returns error if the label is not selectable
    pub fn new(catalog: Arc<LanguageCatalog>, label: &str) -> Result<Self> {
        let language = LanguageConfig::select(&catalog, label)?;
        Ok(Self {
            history: ConversationHistory::new(),
            language,
            catalog,
            failure_policy: FailurePolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[must_use]
    pub const fn language(&self) -> &LanguageConfig {
        &self.language
    }

    #[must_use]
    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Submit a prompt and append the synthesized reply
    ///
    /// The user turn is appended before the external calls start. On failure
    /// it stays unpaired or is retracted, depending on the failure policy.
    ///
    /// # Errors
    ///
    /// Propagates pipeline errors; configuration errors leave the history
    /// untouched
    pub async fn submit(
        &mut self,
        pipeline: &TurnSynthesisPipeline,
        prompt: &str,
    ) -> Result<&Turn> {
        let language = self.begin_submission(prompt)?;
        let outcome = pipeline.process_submission(prompt, &language).await;
        self.complete_submission(outcome)
    }

    /// Validate a prompt and append it as a user turn
    ///
    /// Returns the language settings the reply must be synthesized with, so
    /// the pipeline can run without borrowing the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPrompt`] or [`Error::Config`] without touching
    /// the history
    pub fn begin_submission(&mut self, prompt: &str) -> Result<LanguageConfig> {
        if prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }
        self.language.require_reference()?;

        self.history.append(Turn::user(prompt));
        Ok(self.language.clone())
    }

    /// Record the pipeline outcome for the submission begun last
    ///
    /// # Errors
    ///
    /// Returns the pipeline error after applying the failure policy
    pub fn complete_submission(&mut self, outcome: Result<Turn>) -> Result<&Turn> {
        match outcome {
            Ok(turn) => Ok(self.history.append(turn)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    policy = ?self.failure_policy,
                    "submission failed"
                );
                if self.failure_policy == FailurePolicy::Retract {
                    self.history.rewind_last_exchange();
                }
                Err(e)
            }
        }
    }

    /// Undo the last question and its answer
    pub fn rewind(&mut self) {
        self.history.rewind_last_exchange();
    }

    pub fn clear(&mut self) {
        self.history.clear();
        tracing::debug!("history cleared");
    }

    /// Switch the synthesis language
    ///
    /// # Errors
    ///
    /// Returns error if the label is not selectable
    pub fn select_language(&mut self, label: &str) -> Result<()> {
        self.language.reselect(&self.catalog, label)?;
        tracing::info!(
            label,
            code = self.language.language_code(),
            "language selected"
        );
        Ok(())
    }

    /// Install a freshly captured reference sample
    pub fn set_reference_audio(&mut self, reference: ReferenceAudio) {
        tracing::info!(path = %reference.path.display(), "reference audio updated");
        self.language.set_reference_audio(reference);
    }

    /// Install a reference sample from a WAV file on disk
    ///
    /// # Errors
    ///
    /// Returns error if the file does not exist
    pub fn set_reference_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let reference = ReferenceAudio::from_path(path)?;
        self.set_reference_audio(reference);
        Ok(())
    }
}
