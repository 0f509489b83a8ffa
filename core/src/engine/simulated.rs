use super::Vocalizer;
use crate::utterance::{Utterance, Voice};
use crate::{CadenceError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::trace;

/// Vocalizer that produces no audio.
///
/// Each word takes `word_duration` at the default rate, scaled by the
/// utterance's rate. Spoken words are recorded for inspection.
pub struct SimulatedVocalizer {
    word_duration: Duration,
    voices: Vec<Voice>,
    fail_on: Option<String>,
    spoken: Mutex<Vec<String>>,
}

impl SimulatedVocalizer {
    pub fn new(word_duration: Duration) -> Self {
        Self {
            word_duration,
            voices: default_voices(),
            fail_on: None,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    /// Fail with `CadenceError::Engine` when asked to speak `word`.
    pub fn failing_on(mut self, word: impl Into<String>) -> Self {
        self.fail_on = Some(word.into());
        self
    }

    /// Words completed so far, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    fn duration_for(&self, utterance: &Utterance) -> Duration {
        // rate 0.5 speaks at the nominal pace
        let per_mille = (500.0 + utterance.rate.clamp(0.0, 1.0) * 1000.0).round() as u32;
        self.word_duration * 1000 / per_mille
    }
}

fn default_voices() -> Vec<Voice> {
    [
        ("en-US", "Simulated English (America)"),
        ("en-GB", "Simulated English (Great Britain)"),
        ("fr-FR", "Simulated French"),
        ("ja-JP", "Simulated Japanese"),
    ]
    .into_iter()
    .map(|(lang, name)| Voice::new(format!("sim/{}", lang), name, lang))
    .collect()
}

#[async_trait]
impl Vocalizer for SimulatedVocalizer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn vocalize(&self, word: &str, utterance: &Utterance) -> Result<()> {
        if self.fail_on.as_deref() == Some(word) {
            return Err(CadenceError::Engine(format!(
                "simulated failure on {:?}",
                word
            )));
        }
        tokio::time::sleep(self.duration_for(utterance)).await;
        trace!(target = "tts", word, volume = utterance.volume, "Simulated word");
        self.spoken.lock().push(word.to_string());
        Ok(())
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.clone())
    }
}
