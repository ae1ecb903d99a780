//! Chatterbox multilingual TTS server client
//!
//! The server hosts the voice-cloning model. `POST /load` loads weights onto a
//! device once per process; `POST /synthesize` takes a multipart form with the
//! text, the language code and the reference WAV, and answers with `audio/wav`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::config::TtsConfig;
use crate::pipeline::SpeechSynthesizer;
use crate::session::LanguageCatalog;
use crate::voice::Waveform;
use crate::{Error, Result};

/// Handle to a Chatterbox server with a loaded model
pub struct ChatterboxClient {
    client: Client,
    base_url: String,
    device: String,
    catalog: Arc<LanguageCatalog>,
    loaded: AtomicBool,
}

impl ChatterboxClient {
    /// Create a client without loading the model
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &TtsConfig, catalog: Arc<LanguageCatalog>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            device: config.device.clone(),
            catalog,
            loaded: AtomicBool::new(false),
        })
    }

    /// Create a client and load the model onto the configured device
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the server cannot load the model
    pub async fn load(config: &TtsConfig, catalog: Arc<LanguageCatalog>) -> Result<Self> {
        let client = Self::new(config, catalog)?;
        client.load_model().await?;
        Ok(client)
    }

    /// Ask the server to load model weights
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] on transport failure or a non-success status
    pub async fn load_model(&self) -> Result<()> {
        #[derive(Serialize)]
        struct LoadRequest<'a> {
            device: &'a str,
        }

        tracing::info!(url = %self.base_url, device = %self.device, "loading speech model");

        let response = self
            .client
            .post(format!("{}/load", self.base_url))
            .json(&LoadRequest {
                device: &self.device,
            })
            .send()
            .await
            .map_err(|e| Error::ModelLoad(format!("TTS server unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ModelLoad(format!("TTS load error {status}: {body}")));
        }

        self.loaded.store(true, Ordering::Release);
        tracing::info!(device = %self.device, "speech model loaded");
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Reject inputs the server would refuse, before any request is made
    async fn prepare(&self, reference_audio: &Path, language_code: &str) -> Result<Vec<u8>> {
        if !self.is_loaded() {
            return Err(Error::synthesis("speech model is not loaded"));
        }
        if !self.catalog.supports(language_code) {
            return Err(Error::synthesis(format!(
                "unsupported language code: {language_code}"
            )));
        }
        tokio::fs::read(reference_audio).await.map_err(|e| {
            Error::synthesis(format!(
                "reference audio unreadable ({}): {e}",
                reference_audio.display()
            ))
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ChatterboxClient {
    async fn synthesize(
        &self,
        text: &str,
        reference_audio: &Path,
        language_code: &str,
    ) -> Result<Waveform> {
        let reference = self.prepare(reference_audio, language_code).await?;

        let file_name = reference_audio
            .file_name()
            .map_or_else(|| "reference.wav".to_string(), |n| n.to_string_lossy().into_owned());
        let audio_part = Part::bytes(reference)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| Error::synthesis(e.to_string()))?;

        let form = Form::new()
            .text("text", text.to_string())
            .text("language_id", language_code.to_string())
            .part("audio_prompt", audio_part);

        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::synthesis(format!("TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::synthesis(format!("TTS error {status}: {body}")));
        }

        let wav = response
            .bytes()
            .await
            .map_err(|e| Error::synthesis(format!("TTS response truncated: {e}")))?;

        Waveform::from_wav(&wav).map_err(|e| Error::synthesis(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "chatterbox"
    }
}
