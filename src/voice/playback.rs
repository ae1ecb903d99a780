//! Audio playback to speakers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig, SupportedStreamConfigRange};

use super::Waveform;
use crate::{Error, Result};

/// Plays rendered waveforms on the default output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Output config matching the waveform's rate, preferring mono
    fn config_for(&self, sample_rate: u32) -> Result<StreamConfig> {
        let rate = SampleRate(sample_rate);
        let fits = |c: &SupportedStreamConfigRange, channels: u16| {
            c.channels() == channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
        };

        let supported = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| fits(c, 1))
            .or_else(|| {
                // Fallback: try stereo
                self.device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| fits(c, 2))
            })
            .ok_or_else(|| {
                Error::Audio(format!("no output config supports {sample_rate} Hz"))
            })?;

        Ok(supported.with_sample_rate(rate).config())
    }

    /// Play a waveform to completion
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    #[allow(clippy::unused_async)]
    pub async fn play(&mut self, waveform: &Waveform) -> Result<()> {
        self.play_blocking(waveform)
    }

    fn play_blocking(&self, waveform: &Waveform) -> Result<()> {
        if waveform.samples.is_empty() {
            return Ok(());
        }

        let config = self.config_for(waveform.sample_rate)?;
        let channels = usize::from(config.channels);

        let samples: Arc<[f32]> = Arc::from(waveform.samples.as_slice());
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            self.device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let pos = position.load(Ordering::Relaxed);
                            let sample = samples.get(pos).copied().unwrap_or_else(|| {
                                finished.store(true, Ordering::Relaxed);
                                0.0
                            });
                            frame.fill(sample);
                            if pos < samples.len() {
                                position.store(pos + 1, Ordering::Relaxed);
                            }
                        }
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Poll for completion with timeout
        let start = Instant::now();
        let timeout = Duration::from_secs_f32(waveform.duration_secs()) + Duration::from_millis(500);
        while !finished.load(Ordering::Relaxed) {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // Small delay to ensure audio finishes
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(
            samples = samples.len(),
            sample_rate = waveform.sample_rate,
            "playback complete"
        );

        Ok(())
    }
}
