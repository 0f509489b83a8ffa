use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::setting::Setting;
use crate::{CadenceError, Result};

/// Which engine backs the facade
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// espeak-ng command line engine
    #[default]
    Espeak,
    /// Timed playback without audio
    Simulated,
}

impl FromStr for EngineKind {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "espeak" | "espeak-ng" => Ok(EngineKind::Espeak),
            "simulated" | "sim" => Ok(EngineKind::Simulated),
            other => Err(CadenceError::Config(format!("Unknown engine: {}", other))),
        }
    }
}

/// Registered defaults for the bounded settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SettingDefaults {
    pub rate: f32,
    pub pitch_multiplier: f32,
    pub volume: f32,
}

impl Default for SettingDefaults {
    fn default() -> Self {
        Self {
            rate: Setting::Rate.default_value(),
            pitch_multiplier: Setting::PitchMultiplier.default_value(),
            volume: Setting::Volume.default_value(),
        }
    }
}

impl SettingDefaults {
    pub fn get(&self, setting: Setting) -> f32 {
        match setting {
            Setting::Rate => self.rate,
            Setting::PitchMultiplier => self.pitch_multiplier,
            Setting::Volume => self.volume,
        }
    }

    /// `(key, value)` pairs for `Preferences::register_defaults`, clamped into range
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        Setting::ALL
            .iter()
            .map(|s| (s.key(), Value::from(s.clamp(self.get(*s)))))
            .collect()
    }
}

/// Speech facade configuration
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    /// RocksDB directory for preferences; in-memory when unset
    pub store_path: Option<PathBuf>,
    pub engine: EngineKind,
    /// Per-word duration of the simulated engine at the default rate
    pub word_ms: u64,
    /// Buffer of the event broadcast channel
    pub event_capacity: usize,
    pub log_filter: String,
    pub defaults: SettingDefaults,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            store_path: std::env::var("CADENCE_STORE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            engine: std::env::var("CADENCE_ENGINE")
                .ok()
                .and_then(|s| s.parse::<EngineKind>().ok())
                .unwrap_or_default(),
            word_ms: std::env::var("CADENCE_WORD_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(250),
            event_capacity: 256,
            log_filter: std::env::var("CADENCE_LOG")
                .unwrap_or_else(|_| "info,cadence_core=info,cadence_audio=info".to_string()),
            defaults: SettingDefaults::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CadenceToml {
    store_path: Option<PathBuf>,
    engine: Option<EngineKind>,
    word_ms: Option<u64>,
    event_capacity: Option<usize>,
    log_filter: Option<String>,
    defaults: Option<DefaultsToml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DefaultsToml {
    rate: Option<f32>,
    pitch_multiplier: Option<f32>,
    volume: Option<f32>,
}

impl CadenceToml {
    fn overlay(self, mut base: SpeechConfig) -> Result<SpeechConfig> {
        if let Some(p) = self.store_path {
            base.store_path = Some(p);
        }
        if let Some(e) = self.engine {
            base.engine = e;
        }
        if let Some(w) = self.word_ms {
            base.word_ms = w;
        }
        if let Some(c) = self.event_capacity {
            if c == 0 {
                return Err(CadenceError::Config("event_capacity must be > 0".into()));
            }
            base.event_capacity = c;
        }
        if let Some(f) = self.log_filter {
            base.log_filter = f;
        }
        if let Some(d) = self.defaults {
            if let Some(v) = d.rate {
                base.defaults.rate = Setting::Rate.clamp(v);
            }
            if let Some(v) = d.pitch_multiplier {
                base.defaults.pitch_multiplier = Setting::PitchMultiplier.clamp(v);
            }
            if let Some(v) = d.volume {
                base.defaults.volume = Setting::Volume.clamp(v);
            }
        }
        Ok(base)
    }
}

impl SpeechConfig {
    /// Load configuration from a TOML file (path via CADENCE_CONFIG or ./cadence.toml),
    /// overlaying values onto env-driven defaults. Never fails; problems are logged.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("CADENCE_CONFIG").unwrap_or_else(|_| "cadence.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "cadence", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::from_toml_str_over(&s, default.clone()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(target = "cadence", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "cadence", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Parse TOML over the env-driven defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Self::from_toml_str_over(s, Self::default())
    }

    fn from_toml_str_over(s: &str, base: Self) -> Result<Self> {
        let parsed: CadenceToml =
            toml::from_str(s).map_err(|e| CadenceError::Config(e.to_string()))?;
        parsed.overlay(base)
    }
}
