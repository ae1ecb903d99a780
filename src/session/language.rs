//! Language catalog and the active language/voice selection

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Languages the multilingual speech model accepts, as `(code, label)`
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ms", "Malay"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("tr", "Turkish"),
    ("zh", "Chinese"),
];

/// Code known to the speech model but never offered for selection
pub const RESERVED_CODE: &str = "zh";

/// Fixed code ↔ label mapping with one reserved code hidden from selection
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    entries: Vec<(String, String)>,
    reserved: String,
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::new(SUPPORTED_LANGUAGES, RESERVED_CODE)
    }
}

impl LanguageCatalog {
    /// Build a catalog from `(code, label)` pairs
    #[must_use]
    pub fn new(entries: &[(&str, &str)], reserved: &str) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(code, label)| ((*code).to_string(), (*label).to_string()))
                .collect(),
            reserved: reserved.to_string(),
        }
    }

    fn selectable(&self) -> impl Iterator<Item = &(String, String)> {
        self.entries
            .iter()
            .filter(move |(code, _)| *code != self.reserved)
    }

    /// Labels offered to the user, in catalog order
    #[must_use]
    pub fn selectable_labels(&self) -> Vec<&str> {
        self.selectable().map(|(_, label)| label.as_str()).collect()
    }

    /// Code for a selectable label
    #[must_use]
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.selectable()
            .find(|(_, l)| l == label)
            .map(|(code, _)| code.as_str())
    }

    /// Label for a code, reserved code included
    #[must_use]
    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, label)| label.as_str())
    }

    /// Whether the speech model accepts this code
    #[must_use]
    pub fn supports(&self, code: &str) -> bool {
        self.entries.iter().any(|(c, _)| c == code)
    }

    /// First selectable label, used when nothing was configured
    #[must_use]
    pub fn default_label(&self) -> Option<&str> {
        self.selectable().next().map(|(_, label)| label.as_str())
    }
}

/// Captured voice sample used as the speaker reference
#[derive(Debug, Clone)]
pub struct ReferenceAudio {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

impl ReferenceAudio {
    /// Reference a WAV file on disk
    ///
    /// # Errors
    ///
    /// Returns error if the file does not exist
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::Config(format!(
                "reference audio not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            captured_at: Utc::now(),
        })
    }
}

/// Active synthesis target for the session
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    selected_label: String,
    language_code: String,
    reference_audio: Option<ReferenceAudio>,
}

impl LanguageConfig {
    /// Select a label from the catalog
    ///
    /// # Errors
    ///
    /// Returns error if the label is not selectable
    pub fn select(catalog: &LanguageCatalog, label: &str) -> Result<Self> {
        let code = catalog
            .resolve(label)
            .ok_or_else(|| Error::Config(format!("unsupported language: {label}")))?;
        Ok(Self {
            selected_label: label.to_string(),
            language_code: code.to_string(),
            reference_audio: None,
        })
    }

    /// Replace the selected language, keeping the reference audio
    ///
    /// # Errors
    ///
    /// Returns error if the label is not selectable
    pub fn reselect(&mut self, catalog: &LanguageCatalog, label: &str) -> Result<()> {
        let next = Self::select(catalog, label)?;
        self.selected_label = next.selected_label;
        self.language_code = next.language_code;
        Ok(())
    }

    /// Install a new reference sample, replacing the previous one
    pub fn set_reference_audio(&mut self, reference: ReferenceAudio) {
        self.reference_audio = Some(reference);
    }

    #[must_use]
    pub fn with_reference_audio(mut self, reference: ReferenceAudio) -> Self {
        self.reference_audio = Some(reference);
        self
    }

    #[must_use]
    pub fn selected_label(&self) -> &str {
        &self.selected_label
    }

    #[must_use]
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    #[must_use]
    pub const fn reference_audio(&self) -> Option<&ReferenceAudio> {
        self.reference_audio.as_ref()
    }

    /// Path of the reference sample, required before any synthesis
    ///
    /// # Errors
    ///
    /// Returns error if no sample has been captured yet
    pub fn require_reference(&self) -> Result<&Path> {
        self.reference_audio
            .as_ref()
            .map(|r| r.path.as_path())
            .ok_or_else(|| {
                Error::Config("no reference audio captured; record a voice sample first".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_selectable_label_resolves() {
        let catalog = LanguageCatalog::default();
        let labels = catalog.selectable_labels();
        assert_eq!(labels.len(), SUPPORTED_LANGUAGES.len() - 1);
        for label in labels {
            let code = catalog.resolve(label).unwrap();
            assert_eq!(catalog.label_for(code), Some(label));
        }
    }

    #[test]
    fn test_reserved_code_not_selectable() {
        let catalog = LanguageCatalog::default();
        let reserved_label = catalog.label_for(RESERVED_CODE).unwrap();
        assert_eq!(reserved_label, "Chinese");
        assert!(!catalog.selectable_labels().contains(&reserved_label));
        assert_eq!(catalog.resolve(reserved_label), None);
        assert!(catalog.supports(RESERVED_CODE));
    }

    #[test]
    fn test_resolve_korean() {
        let catalog = LanguageCatalog::default();
        assert_eq!(catalog.resolve("Korean"), Some("ko"));
        assert_eq!(catalog.resolve("Klingon"), None);
    }

    #[test]
    fn test_default_label_is_first_selectable() {
        let catalog = LanguageCatalog::new(&[("zh", "Chinese"), ("en", "English")], "zh");
        assert_eq!(catalog.default_label(), Some("English"));
    }

    #[test]
    fn test_reselect_keeps_reference() {
        let catalog = LanguageCatalog::default();
        let sample = tempfile::NamedTempFile::new().unwrap();
        let mut config = LanguageConfig::select(&catalog, "English")
            .unwrap()
            .with_reference_audio(ReferenceAudio::from_path(sample.path()).unwrap());

        config.reselect(&catalog, "Korean").unwrap();
        assert_eq!(config.language_code(), "ko");
        assert_eq!(config.selected_label(), "Korean");
        assert_eq!(config.require_reference().unwrap(), sample.path());
    }

    #[test]
    fn test_reselect_unknown_label_leaves_config() {
        let catalog = LanguageCatalog::default();
        let mut config = LanguageConfig::select(&catalog, "French").unwrap();
        assert!(matches!(
            config.reselect(&catalog, "Chinese"),
            Err(Error::Config(_))
        ));
        assert_eq!(config.language_code(), "fr");
    }

    #[test]
    fn test_missing_reference_is_config_error() {
        let catalog = LanguageCatalog::default();
        let config = LanguageConfig::select(&catalog, "English").unwrap();
        assert!(matches!(config.require_reference(), Err(Error::Config(_))));
        assert!(ReferenceAudio::from_path("/nonexistent/sample.wav").is_err());
    }
}
