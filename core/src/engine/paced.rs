//! Word-paced engine driver.
//!
//! `PacedEngine` runs one worker task per engine. The worker splits each
//! utterance into words, reports `WillSpeakRange` before each word and hands
//! the word to a [`Vocalizer`]. Commands are served while a word is in
//! flight:
//! - `Immediate` pause/stop drops the in-flight word (it is spoken again on resume)
//! - `Word` pause/stop takes effect once the in-flight word completes

use super::{Boundary, EventSink, SpeechEngine};
use crate::events::SpeechEvent;
use crate::utterance::{word_ranges, CharRange, Utterance, Voice};
use crate::{CadenceError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Speaks single words for a `PacedEngine`.
///
/// Dropping the `vocalize` future must abandon the word.
#[async_trait]
pub trait Vocalizer: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn vocalize(&self, word: &str, utterance: &Utterance) -> Result<()>;

    /// Must return without blocking the runtime
    fn voices(&self) -> Result<Vec<Voice>>;
}

#[derive(Debug)]
enum Command {
    Speak(Utterance),
    Pause(Boundary),
    Resume,
    Stop(Boundary),
}

#[derive(Clone)]
struct Emitter {
    sink: Arc<Mutex<Option<EventSink>>>,
}

impl Emitter {
    fn emit(&self, event: SpeechEvent) {
        let kind = event.kind().as_str();
        match self.sink.lock().as_ref() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    warn!(target = "tts", kind, "Event sink closed; dropped event");
                }
            }
            None => trace!(target = "tts", kind, "No sink attached"),
        }
    }
}

enum Interrupt {
    Pause,
    Stop,
}

enum Outcome {
    Spoken(Result<()>),
    Interrupted(Interrupt),
    Closed,
}

struct Worker<V: Vocalizer> {
    vocalizer: Arc<V>,
    commands: mpsc::UnboundedReceiver<Command>,
    emitter: Emitter,
}

impl<V: Vocalizer> Worker<V> {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Speak(utterance) => {
                    if !self.play(utterance).await {
                        break;
                    }
                }
                other => trace!(target = "tts", command = ?other, "Ignoring command while idle"),
            }
        }
        debug!(target = "tts", engine = self.vocalizer.name(), "Engine worker stopped");
    }

    /// Speak one utterance to completion, cancellation or failure.
    /// Returns false once the command channel has closed.
    async fn play(&mut self, utterance: Utterance) -> bool {
        let words: Vec<(CharRange, String)> = word_ranges(&utterance.text)
            .into_iter()
            .map(|(range, word)| (range, word.to_string()))
            .collect();
        let vocalizer = Arc::clone(&self.vocalizer);

        debug!(target = "tts", engine = vocalizer.name(), words = words.len(), "Speaking");
        self.emitter.emit(SpeechEvent::Started(utterance.clone()));

        let mut idx = 0;
        let mut paused = false;
        while idx < words.len() {
            if paused {
                match self.commands.recv().await {
                    None => return false,
                    Some(Command::Resume) => {
                        paused = false;
                        self.emitter.emit(SpeechEvent::Resumed(utterance.clone()));
                    }
                    Some(Command::Stop(_)) => {
                        self.emitter.emit(SpeechEvent::Cancelled(utterance));
                        return true;
                    }
                    Some(Command::Pause(_)) => {}
                    Some(Command::Speak(_)) => {
                        warn!(target = "tts", "Already speaking; dropped speak request")
                    }
                }
                continue;
            }

            let (range, word) = &words[idx];
            self.emitter.emit(SpeechEvent::WillSpeakRange {
                range: *range,
                utterance: utterance.clone(),
            });

            let mut pause_at_word = false;
            let mut stop_at_word = false;
            let outcome = {
                let spoken = vocalizer.vocalize(word, &utterance);
                tokio::pin!(spoken);
                loop {
                    tokio::select! {
                        res = &mut spoken => break Outcome::Spoken(res),
                        command = self.commands.recv() => match command {
                            None => break Outcome::Closed,
                            Some(Command::Pause(Boundary::Immediate)) => {
                                break Outcome::Interrupted(Interrupt::Pause)
                            }
                            Some(Command::Stop(Boundary::Immediate)) => {
                                break Outcome::Interrupted(Interrupt::Stop)
                            }
                            Some(Command::Pause(Boundary::Word)) => pause_at_word = true,
                            Some(Command::Stop(Boundary::Word)) => stop_at_word = true,
                            Some(Command::Resume) => pause_at_word = false,
                            Some(Command::Speak(_)) => {
                                warn!(target = "tts", "Already speaking; dropped speak request")
                            }
                        },
                    }
                }
            };

            match outcome {
                Outcome::Closed => return false,
                Outcome::Spoken(Err(e)) => {
                    warn!(target = "tts", error = %e, word = %word, "Vocalizer failed");
                    self.emitter.emit(SpeechEvent::Failed {
                        message: e.to_string(),
                        utterance,
                    });
                    return true;
                }
                Outcome::Spoken(Ok(())) => {
                    idx += 1;
                    if stop_at_word {
                        self.emitter.emit(SpeechEvent::Cancelled(utterance));
                        return true;
                    }
                    if pause_at_word && idx < words.len() {
                        paused = true;
                        self.emitter.emit(SpeechEvent::Paused(utterance.clone()));
                    }
                }
                Outcome::Interrupted(Interrupt::Pause) => {
                    paused = true;
                    self.emitter.emit(SpeechEvent::Paused(utterance.clone()));
                }
                Outcome::Interrupted(Interrupt::Stop) => {
                    self.emitter.emit(SpeechEvent::Cancelled(utterance));
                    return true;
                }
            }
        }

        self.emitter.emit(SpeechEvent::Finished(utterance));
        true
    }
}

/// [`SpeechEngine`] that drives a [`Vocalizer`] word by word.
///
/// Must be created inside a Tokio runtime; the worker task ends when the
/// engine is dropped.
pub struct PacedEngine<V: Vocalizer> {
    vocalizer: Arc<V>,
    commands: mpsc::UnboundedSender<Command>,
    sink: Arc<Mutex<Option<EventSink>>>,
}

impl<V: Vocalizer> PacedEngine<V> {
    pub fn new(vocalizer: V) -> Arc<Self> {
        let vocalizer = Arc::new(vocalizer);
        let sink = Arc::new(Mutex::new(None));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            vocalizer: Arc::clone(&vocalizer),
            commands: rx,
            emitter: Emitter {
                sink: Arc::clone(&sink),
            },
        };
        tokio::spawn(worker.run());

        Arc::new(Self {
            vocalizer,
            commands: tx,
            sink,
        })
    }

    pub fn vocalizer(&self) -> &V {
        &self.vocalizer
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CadenceError::Engine("engine worker stopped".to_string()))
    }
}

impl<V: Vocalizer> SpeechEngine for PacedEngine<V> {
    fn name(&self) -> String {
        self.vocalizer.name().to_string()
    }

    fn attach(&self, sink: EventSink) {
        *self.sink.lock() = Some(sink);
    }

    fn speak(&self, utterance: Utterance) -> Result<()> {
        self.send(Command::Speak(utterance))
    }

    fn pause(&self, boundary: Boundary) -> Result<()> {
        self.send(Command::Pause(boundary))
    }

    fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    fn stop(&self, boundary: Boundary) -> Result<()> {
        self.send(Command::Stop(boundary))
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        self.vocalizer.voices()
    }
}
