//! Speech engine boundary.
//!
//! The facade talks to an engine through [`SpeechEngine`]: transport commands
//! go in, [`SpeechEvent`]s come back asynchronously over the [`EventSink`]
//! handed to [`SpeechEngine::attach`].
//!
//! Engines that speak word by word can implement the smaller [`Vocalizer`]
//! trait and be driven by [`PacedEngine`], which owns pausing, resuming and
//! word-boundary reporting.

mod paced;
mod simulated;

pub use paced::{PacedEngine, Vocalizer};
pub use simulated::SimulatedVocalizer;

use crate::events::SpeechEvent;
use crate::utterance::{Utterance, Voice};
use crate::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Channel engines publish lifecycle events on
pub type EventSink = mpsc::UnboundedSender<SpeechEvent>;

/// Where a pause or stop takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Boundary {
    /// Interrupt the current word
    #[default]
    Immediate,
    /// Let the current word finish first
    Word,
}

impl Boundary {
    pub fn from_immediate(immediate: bool) -> Self {
        if immediate {
            Boundary::Immediate
        } else {
            Boundary::Word
        }
    }
}

/// A platform speech engine.
///
/// Commands return once queued; their effect is confirmed by the matching
/// event. Commands that have no effect in the engine's current state are
/// ignored.
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> String;

    /// Register the sink for lifecycle events, replacing any previous one.
    fn attach(&self, sink: EventSink);

    /// Queue `utterance` for speaking. Emits `Started` when speech begins.
    fn speak(&self, utterance: Utterance) -> Result<()>;

    fn pause(&self, boundary: Boundary) -> Result<()>;

    fn resume(&self) -> Result<()>;

    fn stop(&self, boundary: Boundary) -> Result<()>;

    /// Installed voices. Called from `Speech::speak`, so it must not block;
    /// engines that discover voices through a process list them up front.
    fn voices(&self) -> Result<Vec<Voice>>;
}
