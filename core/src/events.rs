//! Speech lifecycle events and handler slots.
//!
//! Engines report [`SpeechEvent`]s over an [`EventSink`](crate::engine::EventSink).
//! The facade's dispatcher applies each event to session state, broadcasts it,
//! then calls the single handler registered for that kind, if any.

use crate::utterance::{CharRange, Utterance};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Lifecycle event emitted by an engine for one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeechEvent {
    Started(Utterance),
    Finished(Utterance),
    Paused(Utterance),
    Resumed(Utterance),
    Cancelled(Utterance),
    /// The given range of the utterance text is about to be spoken
    WillSpeakRange {
        range: CharRange,
        utterance: Utterance,
    },
    /// The engine could not produce speech; the utterance is abandoned
    Failed {
        message: String,
        utterance: Utterance,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Start,
    Finish,
    Pause,
    Resume,
    Cancel,
    WillSpeakRange,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Start,
        EventKind::Finish,
        EventKind::Pause,
        EventKind::Resume,
        EventKind::Cancel,
        EventKind::WillSpeakRange,
        EventKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "speech.start",
            EventKind::Finish => "speech.finish",
            EventKind::Pause => "speech.pause",
            EventKind::Resume => "speech.resume",
            EventKind::Cancel => "speech.cancel",
            EventKind::WillSpeakRange => "speech.will_speak_range",
            EventKind::Error => "speech.error",
        }
    }
}

impl SpeechEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SpeechEvent::Started(_) => EventKind::Start,
            SpeechEvent::Finished(_) => EventKind::Finish,
            SpeechEvent::Paused(_) => EventKind::Pause,
            SpeechEvent::Resumed(_) => EventKind::Resume,
            SpeechEvent::Cancelled(_) => EventKind::Cancel,
            SpeechEvent::WillSpeakRange { .. } => EventKind::WillSpeakRange,
            SpeechEvent::Failed { .. } => EventKind::Error,
        }
    }

    pub fn utterance(&self) -> &Utterance {
        match self {
            SpeechEvent::Started(u)
            | SpeechEvent::Finished(u)
            | SpeechEvent::Paused(u)
            | SpeechEvent::Resumed(u)
            | SpeechEvent::Cancelled(u) => u,
            SpeechEvent::WillSpeakRange { utterance, .. } => utterance,
            SpeechEvent::Failed { utterance, .. } => utterance,
        }
    }

    /// Whether the event ends the utterance's session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SpeechEvent::Finished(_) | SpeechEvent::Cancelled(_) | SpeechEvent::Failed { .. }
        )
    }
}

pub(crate) type UtteranceHandler = Arc<dyn Fn(&Utterance) + Send + Sync>;
pub(crate) type RangeHandler = Arc<dyn Fn(CharRange, &Utterance) + Send + Sync>;
pub(crate) type ErrorHandler = Arc<dyn Fn(&str, &Utterance) + Send + Sync>;

#[derive(Default)]
struct Slots {
    start: Option<UtteranceHandler>,
    finish: Option<UtteranceHandler>,
    pause: Option<UtteranceHandler>,
    resume: Option<UtteranceHandler>,
    cancel: Option<UtteranceHandler>,
    will_speak_range: Option<RangeHandler>,
    error: Option<ErrorHandler>,
}

/// Event kinds whose handler receives only the utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UtteranceKind {
    Start,
    Finish,
    Pause,
    Resume,
    Cancel,
}

impl UtteranceKind {
    pub(crate) const ALL: [UtteranceKind; 5] = [
        UtteranceKind::Start,
        UtteranceKind::Finish,
        UtteranceKind::Pause,
        UtteranceKind::Resume,
        UtteranceKind::Cancel,
    ];
}

impl From<UtteranceKind> for EventKind {
    fn from(kind: UtteranceKind) -> Self {
        match kind {
            UtteranceKind::Start => EventKind::Start,
            UtteranceKind::Finish => EventKind::Finish,
            UtteranceKind::Pause => EventKind::Pause,
            UtteranceKind::Resume => EventKind::Resume,
            UtteranceKind::Cancel => EventKind::Cancel,
        }
    }
}

/// At most one handler per event kind
#[derive(Default)]
pub(crate) struct Handlers {
    slots: RwLock<Slots>,
}

impl Handlers {
    pub(crate) fn set_utterance_handler(&self, kind: UtteranceKind, handler: UtteranceHandler) {
        let mut slots = self.slots.write();
        let slot = match kind {
            UtteranceKind::Start => &mut slots.start,
            UtteranceKind::Finish => &mut slots.finish,
            UtteranceKind::Pause => &mut slots.pause,
            UtteranceKind::Resume => &mut slots.resume,
            UtteranceKind::Cancel => &mut slots.cancel,
        };
        *slot = Some(handler);
    }

    pub(crate) fn set_range_handler(&self, handler: RangeHandler) {
        self.slots.write().will_speak_range = Some(handler);
    }

    pub(crate) fn set_error_handler(&self, handler: ErrorHandler) {
        self.slots.write().error = Some(handler);
    }

    pub(crate) fn is_registered(&self, kind: EventKind) -> bool {
        let slots = self.slots.read();
        match kind {
            EventKind::Start => slots.start.is_some(),
            EventKind::Finish => slots.finish.is_some(),
            EventKind::Pause => slots.pause.is_some(),
            EventKind::Resume => slots.resume.is_some(),
            EventKind::Cancel => slots.cancel.is_some(),
            EventKind::WillSpeakRange => slots.will_speak_range.is_some(),
            EventKind::Error => slots.error.is_some(),
        }
    }

    pub(crate) fn clear(&self) {
        *self.slots.write() = Slots::default();
    }

    /// Call the handler for `event`. The slot lock is released before the
    /// handler runs so handlers may re-register or call back into the facade.
    pub(crate) fn dispatch(&self, event: &SpeechEvent) {
        match event {
            SpeechEvent::WillSpeakRange { range, utterance } => {
                let handler = self.slots.read().will_speak_range.clone();
                match handler {
                    Some(h) => h(*range, utterance),
                    None => trace!(target = "cadence", kind = event.kind().as_str(), "No handler"),
                }
            }
            SpeechEvent::Failed { message, utterance } => {
                let handler = self.slots.read().error.clone();
                match handler {
                    Some(h) => h(message, utterance),
                    None => trace!(target = "cadence", kind = event.kind().as_str(), "No handler"),
                }
            }
            other => {
                let handler = {
                    let slots = self.slots.read();
                    match other.kind() {
                        EventKind::Start => slots.start.clone(),
                        EventKind::Finish => slots.finish.clone(),
                        EventKind::Pause => slots.pause.clone(),
                        EventKind::Resume => slots.resume.clone(),
                        EventKind::Cancel => slots.cancel.clone(),
                        EventKind::WillSpeakRange | EventKind::Error => None,
                    }
                };
                match handler {
                    Some(h) => h(other.utterance()),
                    None => trace!(target = "cadence", kind = other.kind().as_str(), "No handler"),
                }
            }
        }
    }
}
