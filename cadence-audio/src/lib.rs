//! Audio engines for the Cadence speech facade

use cadence_core::{EngineKind, PacedEngine, Result, SimulatedVocalizer, SpeechConfig, SpeechEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "tts")]
pub mod tts;

#[cfg(feature = "tts")]
pub use tts::{EspeakConfig, EspeakVocalizer};

/// Build the engine named by `cfg.engine`.
///
/// Fails with `EngineUnavailable` when the engine cannot run here.
pub async fn select_engine(cfg: &SpeechConfig) -> Result<Arc<dyn SpeechEngine>> {
    let engine: Arc<dyn SpeechEngine> = match cfg.engine {
        EngineKind::Simulated => {
            PacedEngine::new(SimulatedVocalizer::new(Duration::from_millis(cfg.word_ms)))
        }
        EngineKind::Espeak => espeak_engine().await?,
    };
    info!(target = "tts", engine = %engine.name(), "Selected speech engine");
    Ok(engine)
}

#[cfg(feature = "tts")]
async fn espeak_engine() -> Result<Arc<dyn SpeechEngine>> {
    let vocalizer = EspeakVocalizer::new(EspeakConfig::default()).await?;
    Ok(PacedEngine::new(vocalizer))
}

#[cfg(not(feature = "tts"))]
async fn espeak_engine() -> Result<Arc<dyn SpeechEngine>> {
    Err(cadence_core::CadenceError::EngineUnavailable(
        "built without the `tts` feature".into(),
    ))
}
