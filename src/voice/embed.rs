//! Browser-embeddable rendering of synthesized audio

use base64::Engine;

use super::Waveform;
use crate::Result;

/// Render a waveform as an inline `<audio>` element with a WAV data URI
///
/// Only the newest assistant turn should pass `autoplay`
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn embed_audio(waveform: &Waveform, autoplay: bool) -> Result<String> {
    let wav = waveform.to_wav()?;
    Ok(audio_element(&wav, autoplay))
}

/// Wrap already encoded WAV bytes in an `<audio>` element
#[must_use]
pub fn audio_element(wav: &[u8], autoplay: bool) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(wav);
    let controls = if autoplay {
        "<audio controls autoplay>"
    } else {
        "<audio controls>"
    };
    format!(
        "{controls}\n    <source src=\"data:audio/wav;base64,{b64}\" type=\"audio/wav\">\n    Your browser does not support the audio element.\n</audio>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoplay_attribute() {
        let wave = Waveform::new(vec![0.0; 8], 24_000);

        let inert = embed_audio(&wave, false).unwrap();
        assert!(inert.starts_with("<audio controls>"));
        assert!(!inert.contains("autoplay"));

        let live = embed_audio(&wave, true).unwrap();
        assert!(live.starts_with("<audio controls autoplay>"));
    }

    #[test]
    fn test_data_uri_is_decodable_wav() {
        let html = audio_element(b"RIFF0000WAVE", false);
        let start = html.find("base64,").unwrap() + "base64,".len();
        let end = html[start..].find('"').unwrap() + start;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&html[start..end])
            .unwrap();
        assert_eq!(decoded, b"RIFF0000WAVE");
        assert!(html.contains("type=\"audio/wav\""));
    }
}
