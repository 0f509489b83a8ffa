// Logging setup and event observability
use crate::events::SpeechEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber. `RUST_LOG` takes precedence over `default_filter`.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Log every event from a facade subscription on the `speech` target.
pub fn spawn_event_logger(mut rx: broadcast::Receiver<SpeechEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SpeechEvent::WillSpeakRange { range, .. }) => {
                    debug!(
                        target = "speech",
                        location = range.location,
                        length = range.length,
                        "speech.will_speak_range"
                    );
                }
                Ok(SpeechEvent::Failed { message, .. }) => {
                    warn!(target = "speech", error = %message, "speech.error");
                }
                Ok(event) => {
                    let u = event.utterance();
                    info!(
                        target = "speech",
                        kind = event.kind().as_str(),
                        chars = u.text.chars().count(),
                        language = %u.language,
                        rate = u.rate,
                        volume = u.volume,
                        "Speech event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(target = "speech", skipped = n, "Event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
