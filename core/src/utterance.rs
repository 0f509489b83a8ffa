//! Utterances, voices and character ranges.

use crate::setting::Setting;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// A voice reported by an engine's catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-specific identifier
    pub id: String,
    pub name: String,
    /// BCP-47 style language tag, e.g. `en-US`
    pub language: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }

    /// Primary language subtag (`en` for `en-US`), lowercased
    pub fn primary_language(&self) -> String {
        primary_subtag(&self.language)
    }
}

pub(crate) fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Range of characters (not bytes) within an utterance's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharRange {
    pub location: usize,
    pub length: usize,
}

impl CharRange {
    pub fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    pub fn end(&self) -> usize {
        self.location + self.length
    }
}

/// Word ranges of `text` in speaking order, paired with the word itself.
///
/// Punctuation and whitespace runs are skipped.
pub fn word_ranges(text: &str) -> Vec<(CharRange, &str)> {
    let mut out = Vec::new();
    let mut chars_seen = 0usize;
    let mut last_byte = 0usize;
    for (byte_idx, word) in text.split_word_bound_indices() {
        chars_seen += text[last_byte..byte_idx].chars().count();
        last_byte = byte_idx;
        let len = word.chars().count();
        if word.chars().any(char::is_alphanumeric) {
            out.push((CharRange::new(chars_seen, len), word));
        }
    }
    out
}

/// One immutable speech request.
///
/// Equality is structural over every field, so two utterances built from the
/// same text and settings compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch_multiplier: f32,
    /// Effective volume; 0.0 whenever muted
    pub volume: f32,
}

impl Default for Utterance {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Utterance {
    /// Utterance for `text` with engine default prosody and no voice yet.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: String::new(),
            voice: None,
            rate: Setting::Rate.default_value(),
            pitch_multiplier: Setting::PitchMultiplier.default_value(),
            volume: Setting::Volume.default_value(),
        }
    }

    pub fn build(
        text: impl Into<String>,
        language: impl Into<String>,
        voice: Option<Voice>,
        rate: f32,
        pitch_multiplier: f32,
        volume: f32,
    ) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            voice,
            rate,
            pitch_multiplier,
            volume,
        }
    }

    /// Same text, new voice and prosody.
    pub fn with_prosody(
        &self,
        language: impl Into<String>,
        voice: Option<Voice>,
        rate: f32,
        pitch_multiplier: f32,
        volume: f32,
    ) -> Self {
        Self::build(
            self.text.clone(),
            language,
            voice,
            rate,
            pitch_multiplier,
            volume,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
