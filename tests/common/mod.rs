//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use voicechat::voice::samples_to_wav;
use voicechat::{
    Error, GenerationParams, LanguageCatalog, Result, Session, SpeechSynthesizer, TextGenerator,
    TurnSynthesisPipeline, Waveform,
};

/// Ordered record of external calls made by the mocks
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Text generator that replies with a fixed string or fails
pub struct MockGenerator {
    pub log: CallLog,
    pub reply: std::result::Result<String, String>,
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, instruction: &str, _params: GenerationParams) -> Result<String> {
        self.log.push(format!("generate:{instruction}"));
        self.reply.clone().map_err(Error::Service)
    }

    fn name(&self) -> &'static str {
        "mock-generator"
    }
}

/// Synthesizer that renders a short tone or fails, optionally after a delay
pub struct MockSynthesizer {
    pub log: CallLog,
    pub fail: bool,
    pub delay: Duration,
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        reference_audio: &Path,
        language_code: &str,
    ) -> Result<Waveform> {
        self.log.push(format!(
            "synthesize:{language_code}:{}:{text}",
            reference_audio.display()
        ));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(Error::synthesis("model exploded"));
        }
        Ok(Waveform::new(vec![0.1; 2400], 24_000))
    }

    fn name(&self) -> &'static str {
        "mock-synthesizer"
    }
}

/// Pipeline over mocks plus the log they write to
pub fn mock_pipeline(
    reply: std::result::Result<&str, &str>,
    synth_fails: bool,
) -> (TurnSynthesisPipeline, CallLog) {
    build_pipeline(reply, synth_fails, Duration::ZERO)
}

/// Pipeline whose synthesizer takes `delay` to answer
pub fn slow_pipeline(reply: &str, delay: Duration) -> (TurnSynthesisPipeline, CallLog) {
    build_pipeline(Ok(reply), false, delay)
}

fn build_pipeline(
    reply: std::result::Result<&str, &str>,
    synth_fails: bool,
    delay: Duration,
) -> (TurnSynthesisPipeline, CallLog) {
    let log = CallLog::default();
    let generator = MockGenerator {
        log: log.clone(),
        reply: reply.map(ToString::to_string).map_err(ToString::to_string),
    };
    let synthesizer = MockSynthesizer {
        log: log.clone(),
        fail: synth_fails,
        delay,
    };
    let pipeline = TurnSynthesisPipeline::new(
        Arc::new(generator),
        Arc::new(synthesizer),
        GenerationParams::default(),
    );
    (pipeline, log)
}

/// A small WAV file usable as a reference voice
pub fn reference_wav() -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".wav")
        .tempfile()
        .expect("failed to create temp wav");
    let wav = samples_to_wav(&[0.0, 0.2, -0.2, 0.0], 16_000).expect("failed to encode wav");
    std::fs::write(file.path(), wav).expect("failed to write temp wav");
    file
}

/// Session in the given language, optionally with a reference voice
pub fn session(label: &str, reference: Option<&Path>) -> Session {
    let catalog = Arc::new(LanguageCatalog::default());
    let mut session = Session::new(catalog, label).expect("failed to create session");
    if let Some(path) = reference {
        session
            .set_reference_path(path)
            .expect("failed to set reference");
    }
    session
}
