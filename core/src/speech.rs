//! Speech facade.
//!
//! `Speech` owns one engine session, the user's preferences and the current
//! utterance. At most one utterance is in flight: `speak` while speaking is a
//! no-op. Engine events are handled by a single dispatcher task which updates
//! the session flags before calling the registered handler, so a handler
//! always observes the state its event produced.
//!
//! Requires a Tokio runtime at construction.

use crate::config::{SettingDefaults, SpeechConfig};
use crate::engine::{Boundary, SpeechEngine};
use crate::events::{EventKind, Handlers, SpeechEvent, UtteranceKind};
use crate::preferences::{InMemoryBackend, PreferenceBackend, Preferences, RocksDbBackend};
use crate::setting::Setting;
use crate::utterance::{primary_subtag, CharRange, Utterance, Voice};
use crate::{CadenceError, Result};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct Current {
    text: String,
    utterance: Utterance,
}

#[derive(Debug, Default, Clone, Copy)]
struct Session {
    speaking: bool,
    paused: bool,
}

impl Session {
    fn apply(&mut self, event: &SpeechEvent) {
        match event {
            SpeechEvent::Started(_) => {
                self.speaking = true;
                self.paused = false;
            }
            SpeechEvent::Paused(_) => self.paused = true,
            SpeechEvent::Resumed(_) => self.paused = false,
            SpeechEvent::Finished(_) | SpeechEvent::Cancelled(_) | SpeechEvent::Failed { .. } => {
                self.speaking = false;
                self.paused = false;
            }
            SpeechEvent::WillSpeakRange { .. } => {}
        }
    }
}

/// Builder for [`Speech`]
pub struct SpeechBuilder {
    engine: Option<Arc<dyn SpeechEngine>>,
    preferences: Option<Preferences>,
    defaults: Option<SettingDefaults>,
    event_capacity: usize,
}

impl Default for SpeechBuilder {
    fn default() -> Self {
        Self {
            engine: None,
            preferences: None,
            defaults: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SpeechBuilder {
    pub fn engine(mut self, engine: Arc<dyn SpeechEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Registered defaults layered over the standard ones
    pub fn defaults(mut self, defaults: SettingDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Arc<Speech>> {
        let engine = self
            .engine
            .ok_or_else(|| CadenceError::EngineUnavailable("no engine configured".into()))?;
        if self.event_capacity == 0 {
            return Err(CadenceError::Config("event_capacity must be > 0".into()));
        }
        let preferences = self.preferences.unwrap_or_else(Preferences::in_memory);
        if let Some(defaults) = self.defaults {
            preferences.register_defaults(defaults.entries());
        }
        Ok(Speech::start(engine, preferences, self.event_capacity))
    }
}

/// Preference-bounded speech synthesis facade
pub struct Speech {
    engine: Arc<dyn SpeechEngine>,
    preferences: Preferences,
    current: Mutex<Current>,
    session: Arc<Mutex<Session>>,
    handlers: Arc<Handlers>,
    events: broadcast::Sender<SpeechEvent>,
    dispatcher: JoinHandle<()>,
}

impl Speech {
    pub fn builder() -> SpeechBuilder {
        SpeechBuilder::default()
    }

    pub fn new(engine: Arc<dyn SpeechEngine>, preferences: Preferences) -> Arc<Self> {
        Self::start(engine, preferences, DEFAULT_EVENT_CAPACITY)
    }

    /// Build from config: opens the RocksDB store when `store_path` is set.
    pub fn from_config(cfg: &SpeechConfig, engine: Arc<dyn SpeechEngine>) -> Result<Arc<Self>> {
        let backend: Arc<dyn PreferenceBackend> = match &cfg.store_path {
            Some(path) => RocksDbBackend::open(path)?,
            None => InMemoryBackend::new(),
        };
        Self::builder()
            .engine(engine)
            .preferences(Preferences::new(backend))
            .defaults(cfg.defaults)
            .event_capacity(cfg.event_capacity)
            .build()
    }

    fn start(
        engine: Arc<dyn SpeechEngine>,
        preferences: Preferences,
        event_capacity: usize,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        engine.attach(tx);

        let (events, _) = broadcast::channel(event_capacity);
        let session = Arc::new(Mutex::new(Session::default()));
        let handlers = Arc::new(Handlers::default());

        let dispatcher = tokio::spawn(dispatch_events(
            rx,
            Arc::clone(&session),
            Arc::clone(&handlers),
            events.clone(),
        ));

        info!(target = "cadence", engine = %engine.name(), "Speech facade ready");
        Arc::new(Self {
            engine,
            preferences,
            current: Mutex::new(Current::default()),
            session,
            handlers,
            events,
            dispatcher,
        })
    }

    // ---- text & utterance ----

    pub fn text(&self) -> String {
        self.current.lock().text.clone()
    }

    /// Replace the text. The utterance is rebuilt only when the text differs.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut current = self.current.lock();
        if current.text != text {
            current.utterance = Utterance::new(text.clone());
            current.text = text;
        }
    }

    pub fn utterance(&self) -> Utterance {
        self.current.lock().utterance.clone()
    }

    // ---- preferences ----

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn language(&self) -> Result<String> {
        self.preferences.language()
    }

    pub fn set_language(&self, language: &str) -> Result<()> {
        self.preferences.set_language(language)
    }

    pub fn rate(&self) -> Result<f32> {
        self.value(Setting::Rate)
    }

    pub fn set_rate(&self, rate: f32) -> Result<()> {
        self.set_value(Setting::Rate, rate)
    }

    pub fn pitch_multiplier(&self) -> Result<f32> {
        self.value(Setting::PitchMultiplier)
    }

    pub fn set_pitch_multiplier(&self, pitch: f32) -> Result<()> {
        self.set_value(Setting::PitchMultiplier, pitch)
    }

    /// Effective volume: 0.0 while muted, the stored volume otherwise.
    pub fn volume(&self) -> Result<f32> {
        if self.muted()? {
            Ok(0.0)
        } else {
            self.value(Setting::Volume)
        }
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.set_value(Setting::Volume, volume)
    }

    pub fn muted(&self) -> Result<bool> {
        self.preferences.muted()
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.preferences.set_muted(muted)
    }

    /// Stored value of a setting (volume ignores mute here)
    pub fn value(&self, setting: Setting) -> Result<f32> {
        self.preferences.load_setting(setting)
    }

    pub fn set_value(&self, setting: Setting, value: f32) -> Result<()> {
        self.preferences.store_setting(setting, value)
    }

    pub fn increment(&self, setting: Setting) -> Result<()> {
        let current = self.value(setting)?;
        self.set_value(setting, setting.increment(current))
    }

    pub fn decrement(&self, setting: Setting) -> Result<()> {
        let current = self.value(setting)?;
        self.set_value(setting, setting.decrement(current))
    }

    pub fn incrementable(&self, setting: Setting) -> Result<bool> {
        Ok(setting.incrementable(self.value(setting)?))
    }

    pub fn decrementable(&self, setting: Setting) -> Result<bool> {
        Ok(setting.decrementable(self.value(setting)?))
    }

    // ---- voices ----

    pub fn voices(&self) -> Result<Vec<Voice>> {
        self.engine.voices()
    }

    /// Languages of the installed voices, first occurrence order, no duplicates
    pub fn languages(&self) -> Result<Vec<String>> {
        let mut languages: Vec<String> = Vec::new();
        for voice in self.voices()? {
            if !languages.contains(&voice.language) {
                languages.push(voice.language);
            }
        }
        Ok(languages)
    }

    /// Voice for the current language, if the engine has one
    pub fn voice(&self) -> Result<Option<Voice>> {
        let language = self.language()?;
        Ok(resolve_voice(&self.voices()?, &language))
    }

    // ---- transport ----

    pub fn is_speaking(&self) -> bool {
        self.session.lock().speaking
    }

    pub fn is_paused(&self) -> bool {
        self.session.lock().paused
    }

    /// Speak the current text with the current settings.
    ///
    /// No-op while already speaking or when the text is blank. Fails with
    /// `EngineUnavailable` when no voice matches the configured language.
    pub fn speak(&self) -> Result<()> {
        if self.is_speaking() {
            debug!(target = "cadence", "Already speaking; speak ignored");
            return Ok(());
        }
        if self.current.lock().utterance.is_empty() {
            debug!(target = "cadence", "Nothing to speak");
            return Ok(());
        }

        let language = self.language()?;
        let voice = resolve_voice(&self.voices()?, &language).ok_or_else(|| {
            CadenceError::EngineUnavailable(format!(
                "{} has no voice for language {}",
                self.engine.name(),
                language
            ))
        })?;
        let rate = self.rate()?;
        let pitch = self.pitch_multiplier()?;
        let volume = self.volume()?;

        let utterance = {
            let mut current = self.current.lock();
            let applied = current
                .utterance
                .with_prosody(language, Some(voice), rate, pitch, volume);
            current.utterance = applied.clone();
            applied
        };

        {
            let mut session = self.session.lock();
            if session.speaking {
                return Ok(());
            }
            session.speaking = true;
            session.paused = false;
        }

        info!(
            target = "cadence",
            chars = utterance.text.chars().count(),
            language = %utterance.language,
            rate = utterance.rate,
            pitch = utterance.pitch_multiplier,
            volume = utterance.volume,
            "Speaking"
        );
        if let Err(e) = self.engine.speak(utterance) {
            self.session.lock().speaking = false;
            return Err(e);
        }
        Ok(())
    }

    pub fn pause(&self, boundary: Boundary) -> Result<()> {
        if !self.is_speaking() {
            debug!(target = "cadence", "Not speaking; pause ignored");
            return Ok(());
        }
        debug!(target = "cadence", ?boundary, "Pause");
        self.engine.pause(boundary)
    }

    pub fn resume(&self) -> Result<()> {
        if !self.is_speaking() {
            debug!(target = "cadence", "Not speaking; resume ignored");
            return Ok(());
        }
        debug!(target = "cadence", "Resume");
        self.engine.resume()
    }

    /// Request a stop; confirmed by the `Cancelled` event.
    pub fn stop(&self, boundary: Boundary) -> Result<()> {
        if !self.is_speaking() {
            debug!(target = "cadence", "Not speaking; stop ignored");
            return Ok(());
        }
        debug!(target = "cadence", ?boundary, "Stop");
        self.engine.stop(boundary)
    }

    /// Stop any speech, clear text and utterance, remove every stored
    /// preference and drop every handler.
    pub fn reset(&self) -> Result<()> {
        if self.is_speaking() {
            self.stop(Boundary::Immediate)?;
        }
        *self.current.lock() = Current::default();
        self.preferences.clear()?;
        self.handlers.clear();
        info!(target = "cadence", "Speech facade reset");
        Ok(())
    }

    // ---- events ----

    pub fn on_start<F>(&self, f: F)
    where
        F: Fn(&Utterance) + Send + Sync + 'static,
    {
        self.handlers
            .set_utterance_handler(UtteranceKind::Start, Arc::new(f));
    }

    pub fn on_finish<F>(&self, f: F)
    where
        F: Fn(&Utterance) + Send + Sync + 'static,
    {
        self.handlers
            .set_utterance_handler(UtteranceKind::Finish, Arc::new(f));
    }

    pub fn on_pause<F>(&self, f: F)
    where
        F: Fn(&Utterance) + Send + Sync + 'static,
    {
        self.handlers
            .set_utterance_handler(UtteranceKind::Pause, Arc::new(f));
    }

    pub fn on_resume<F>(&self, f: F)
    where
        F: Fn(&Utterance) + Send + Sync + 'static,
    {
        self.handlers
            .set_utterance_handler(UtteranceKind::Resume, Arc::new(f));
    }

    pub fn on_cancel<F>(&self, f: F)
    where
        F: Fn(&Utterance) + Send + Sync + 'static,
    {
        self.handlers
            .set_utterance_handler(UtteranceKind::Cancel, Arc::new(f));
    }

    pub fn on_will_speak_range<F>(&self, f: F)
    where
        F: Fn(CharRange, &Utterance) + Send + Sync + 'static,
    {
        self.handlers.set_range_handler(Arc::new(f));
    }

    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&str, &Utterance) + Send + Sync + 'static,
    {
        self.handlers.set_error_handler(Arc::new(f));
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.is_registered(kind)
    }

    /// Observe every event, independent of the handlers
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.events.subscribe()
    }
}

impl Drop for Speech {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Exact tag match (case-insensitive) first, then primary subtag.
fn resolve_voice(voices: &[Voice], language: &str) -> Option<Voice> {
    voices
        .iter()
        .find(|v| v.language.eq_ignore_ascii_case(language))
        .or_else(|| {
            let primary = primary_subtag(language);
            voices.iter().find(|v| v.primary_language() == primary)
        })
        .cloned()
}

async fn dispatch_events(
    mut rx: mpsc::UnboundedReceiver<SpeechEvent>,
    session: Arc<Mutex<Session>>,
    handlers: Arc<Handlers>,
    events: broadcast::Sender<SpeechEvent>,
) {
    while let Some(event) = rx.recv().await {
        session.lock().apply(&event);
        trace!(target = "cadence", kind = event.kind().as_str(), "Dispatching event");

        // No subscribers is fine
        let _ = events.send(event.clone());

        if catch_unwind(AssertUnwindSafe(|| handlers.dispatch(&event))).is_err() {
            error!(
                target = "cadence",
                kind = event.kind().as_str(),
                "Event handler panicked"
            );
        }
    }
    debug!(target = "cadence", "Event dispatcher stopped");
}
