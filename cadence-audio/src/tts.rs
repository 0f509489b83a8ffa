//! espeak-ng word vocalizer
//!
//! Speaks one word per `espeak-ng` invocation so a [`PacedEngine`] can pause,
//! resume and report word ranges. Playback goes straight to the default audio
//! device; no WAV files are written.
//!
//! The voice catalog is listed once, asynchronously, when the vocalizer is
//! built and served from memory afterwards. Call
//! [`EspeakVocalizer::refresh_voices`] after installing voices.
//!
//! Env overrides:
//! - ESPEAK_BIN (falls back to `espeak-ng`, then `espeak`, on PATH)
//!
//! [`PacedEngine`]: cadence_core::PacedEngine

use async_trait::async_trait;
use cadence_core::{CadenceError, Result, Utterance, Vocalizer, Voice};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, trace};

#[derive(Clone, Debug)]
pub struct EspeakConfig {
    pub espeak_bin: Option<PathBuf>,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        let espeak_bin =
            get_from_env_or_path("ESPEAK_BIN", "espeak-ng").or_else(|| get_from_path("espeak"));
        Self { espeak_bin }
    }
}

fn get_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    get_from_path(default_bin)
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.exists())
}

pub struct EspeakVocalizer {
    bin: PathBuf,
    voices: RwLock<Vec<Voice>>,
}

impl EspeakVocalizer {
    /// Locate espeak-ng and list its voices.
    ///
    /// Fails with `EngineUnavailable` when no binary was found or it cannot
    /// list voices.
    pub async fn new(cfg: EspeakConfig) -> Result<Self> {
        let bin = cfg.espeak_bin.ok_or_else(|| {
            CadenceError::EngineUnavailable(
                "espeak-ng not found; install it or set ESPEAK_BIN".into(),
            )
        })?;
        let voices = list_voices(&bin).await.map_err(|e| {
            CadenceError::EngineUnavailable(format!("{}: {}", bin.display(), e))
        })?;
        info!(target = "tts", bin = ?bin, voices = voices.len(), "Detected espeak-ng binary");
        Ok(Self {
            bin,
            voices: RwLock::new(voices),
        })
    }

    /// Re-list installed voices. Returns the new voice count.
    pub async fn refresh_voices(&self) -> Result<usize> {
        let voices = list_voices(&self.bin).await?;
        let count = voices.len();
        *self.voices.write() = voices;
        Ok(count)
    }

    fn command(&self, word: &str, utterance: &Utterance) -> Command {
        let voice = utterance
            .voice
            .as_ref()
            .map(|v| v.language.as_str())
            .unwrap_or(utterance.language.as_str());

        let mut cmd = Command::new(&self.bin);
        if !voice.is_empty() {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("-s").arg(words_per_minute(utterance.rate).to_string());
        cmd.arg("-p").arg(pitch(utterance.pitch_multiplier).to_string());
        cmd.arg("-a").arg(amplitude(utterance.volume).to_string());
        cmd.arg("--").arg(word);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Vocalizer for EspeakVocalizer {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    async fn vocalize(&self, word: &str, utterance: &Utterance) -> Result<()> {
        let mut cmd = self.command(word, utterance);
        trace!(target = "tts", word, "Running espeak-ng");
        // Dropping this future kills the child
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(CadenceError::Engine(format!(
                "espeak-ng failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.read().clone())
    }
}

async fn list_voices(bin: &Path) -> Result<Vec<Voice>> {
    let output = Command::new(bin)
        .arg("--voices")
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        return Err(CadenceError::Engine(format!(
            "espeak-ng --voices failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let voices = parse_voices(&String::from_utf8_lossy(&output.stdout));
    debug!(target = "tts", count = voices.len(), "Listed espeak-ng voices");
    Ok(voices)
}

/// Parse `espeak-ng --voices` output.
///
/// Columns: Pty, Language, Age/Gender, VoiceName, File, Other Languages.
pub(crate) fn parse_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 5 {
                return None;
            }
            let language = normalize_language(cols[1]);
            let name = cols[3].replace('_', " ");
            Some(Voice::new(cols[4], name, language))
        })
        .collect()
}

/// `en-us` -> `en-US`; other subtags are left alone.
fn normalize_language(tag: &str) -> String {
    let mut parts = tag.split('-');
    let mut out = parts.next().unwrap_or_default().to_ascii_lowercase();
    for part in parts {
        out.push('-');
        if part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()) {
            out.push_str(&part.to_ascii_uppercase());
        } else {
            out.push_str(part);
        }
    }
    out
}

/// Rate 0..1 to words per minute; 0.5 is espeak's default 175.
fn words_per_minute(rate: f32) -> u32 {
    let rate = rate.clamp(0.0, 1.0);
    let wpm = if rate <= 0.5 {
        80.0 + rate * 2.0 * 95.0
    } else {
        175.0 + (rate - 0.5) * 2.0 * 275.0
    };
    wpm.round() as u32
}

/// Pitch multiplier 0.5..2 to espeak pitch 0..99; 1.0 is the default 50.
fn pitch(multiplier: f32) -> u32 {
    let m = multiplier.clamp(0.5, 2.0);
    let p = if m <= 1.0 {
        (m - 0.5) * 2.0 * 50.0
    } else {
        50.0 + (m - 1.0) * 49.0
    };
    p.round() as u32
}

/// Volume 0..1 to espeak amplitude 0..100.
fn amplitude(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u32
}
