mod cli;

use cadence_audio::select_engine;
use cadence_core::telemetry::{init_tracing, spawn_event_logger};
use cadence_core::{Boundary, Setting, Speech, SpeechConfig};
use clap::Parser;
use cli::{Cli, Step};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Defaults + env + optional TOML overlay; CLI wins
    let mut cfg = SpeechConfig::load();
    if let Some(engine) = cli.engine {
        cfg.engine = engine;
    }
    init_tracing(&cfg.log_filter);

    let engine = select_engine(&cfg).await?;
    let speech = Speech::from_config(&cfg, engine)?;
    let logger = spawn_event_logger(speech.subscribe());

    if cli.reset {
        speech.reset()?;
    }
    if let Some(language) = &cli.language {
        speech.set_language(language)?;
    }
    for (setting, step) in cli.steps() {
        match step {
            Step::Up => speech.increment(setting)?,
            Step::Down => speech.decrement(setting)?,
        }
    }
    if cli.mute {
        speech.set_muted(true)?;
    } else if cli.unmute {
        speech.set_muted(false)?;
    }

    if cli.voices {
        for voice in speech.voices()? {
            println!("{:<16} {:<32} {}", voice.language, voice.name, voice.id);
        }
        return Ok(());
    }

    println!(
        "language={} rate={:.1} pitch={:.1} volume={:.1}{}",
        speech.language()?,
        speech.value(Setting::Rate)?,
        speech.value(Setting::PitchMultiplier)?,
        speech.value(Setting::Volume)?,
        if speech.muted()? { " (muted)" } else { "" }
    );

    let text = cli.joined_text();
    if text.trim().is_empty() {
        return Ok(());
    }

    speech.set_text(text.clone());
    let chars: Vec<char> = text.chars().collect();
    speech.on_will_speak_range(move |range, _| {
        let end = range.end().min(chars.len());
        let word: String = chars
            .get(range.location..end)
            .unwrap_or_default()
            .iter()
            .collect();
        println!("  {}", word);
    });
    speech.on_error(|message, _| eprintln!("speech failed: {}", message));

    let mut events = speech.subscribe();
    speech.speak()?;
    if !speech.is_speaking() {
        return Ok(());
    }

    let boundary = Boundary::from_immediate(!cli.word_boundary);
    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(ev) if ev.is_terminal() => {
                    info!(target = "speak", kind = ev.kind().as_str(), "Done");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!(target = "speak", skipped = n, "Lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = signal::ctrl_c() => {
                info!(target = "speak", ?boundary, "Interrupted; stopping");
                speech.stop(boundary)?;
            }
        }
    }

    logger.abort();
    Ok(())
}
