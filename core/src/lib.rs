// Cadence Core Library
// Preference-bounded speech synthesis facade

pub mod config;
pub mod engine;
pub mod events;
pub mod preferences;
pub mod setting;
pub mod speech;
pub mod telemetry;
pub mod utterance;

// Export core types
pub use config::{EngineKind, SettingDefaults, SpeechConfig};
pub use engine::{Boundary, EventSink, PacedEngine, SimulatedVocalizer, SpeechEngine, Vocalizer};
pub use events::{EventKind, SpeechEvent};
pub use preferences::{InMemoryBackend, PreferenceBackend, Preferences, RocksDbBackend};
pub use setting::Setting;
pub use speech::{Speech, SpeechBuilder};
pub use utterance::{CharRange, Utterance, Voice};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadenceError {
    /// A preference was read that has neither a stored value nor a registered default.
    #[error("No value or registered default for preference: {0}")]
    MissingDefault(String),

    #[error("Speech engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, CadenceError>;
