//! Voice processing module
//!
//! Handles reference-sample capture, rendered waveforms, playback, and
//! browser embedding. Speech synthesis itself lives behind
//! [`crate::pipeline::SpeechSynthesizer`]

mod capture;
mod embed;
mod playback;
mod waveform;

pub use capture::{AudioCapture, SAMPLE_RATE, record_reference, save_reference};
pub use embed::{audio_element, embed_audio};
pub use playback::AudioPlayback;
pub use waveform::{Waveform, samples_to_wav};
