use cadence_core::{
    Boundary, CadenceError, CharRange, EventKind, PacedEngine, Preferences, Setting,
    SimulatedVocalizer, Speech, SpeechEvent, Voice,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

// Helper to build a facade over the simulated engine
fn speech_with(word_ms: u64) -> (Arc<Speech>, Arc<PacedEngine<SimulatedVocalizer>>) {
    let engine = PacedEngine::new(SimulatedVocalizer::new(Duration::from_millis(word_ms)));
    let speech = Speech::new(engine.clone(), Preferences::in_memory());
    (speech, engine)
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed")
}

async fn next_event(rx: &mut broadcast::Receiver<SpeechEvent>) -> SpeechEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed")
}

async fn until_terminal(rx: &mut broadcast::Receiver<SpeechEvent>) -> Vec<SpeechEvent> {
    let mut seen = Vec::new();
    loop {
        let ev = next_event(rx).await;
        let done = ev.is_terminal();
        seen.push(ev);
        if done {
            return seen;
        }
    }
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[tokio::test]
async fn fresh_instance_reads_registered_defaults() {
    let (speech, _) = speech_with(10);
    assert_eq!(speech.language().unwrap(), "en-US");
    assert_eq!(speech.rate().unwrap(), Setting::Rate.default_value());
    assert_eq!(
        speech.pitch_multiplier().unwrap(),
        Setting::PitchMultiplier.default_value()
    );
    assert_eq!(speech.volume().unwrap(), Setting::Volume.default_value());
    assert!(!speech.muted().unwrap());
    assert!(!speech.is_speaking());
    assert!(!speech.is_paused());
}

#[tokio::test]
async fn utterance_rebuilt_only_when_text_changes() {
    let (speech, _) = speech_with(10);

    speech.set_text("text");
    let a = speech.utterance();
    speech.set_text("text");
    let b = speech.utterance();
    speech.set_text("text2");
    let c = speech.utterance();

    assert_eq!(a, b);
    assert_ne!(b, c);
    assert_eq!(c.text, "text2");
}

#[tokio::test]
async fn increment_and_decrement_each_setting() {
    let (speech, _) = speech_with(10);

    for setting in Setting::ALL {
        speech.decrement(setting).unwrap();
        assert!(approx(
            speech.value(setting).unwrap(),
            setting.default_value() - Setting::STEP
        ));
        assert!(speech.incrementable(setting).unwrap());

        speech.increment(setting).unwrap();
        assert!(approx(speech.value(setting).unwrap(), setting.default_value()));
        assert!(speech.decrementable(setting).unwrap());
    }
}

#[tokio::test]
async fn repeated_steps_stop_at_bounds() {
    let (speech, _) = speech_with(10);

    for setting in Setting::ALL {
        for _ in 0..40 {
            speech.increment(setting).unwrap();
        }
        assert_eq!(speech.value(setting).unwrap(), setting.maximum_value());
        assert!(!speech.incrementable(setting).unwrap());

        for _ in 0..40 {
            speech.decrement(setting).unwrap();
        }
        assert_eq!(speech.value(setting).unwrap(), setting.minimum_value());
        assert!(!speech.decrementable(setting).unwrap());
    }
}

#[tokio::test]
async fn muting_forces_zero_volume_and_unmuting_restores() {
    let (speech, _) = speech_with(10);
    speech.set_volume(0.7).unwrap();

    speech.set_muted(true).unwrap();
    assert!(speech.muted().unwrap());
    assert_eq!(speech.volume().unwrap(), 0.0);
    assert_eq!(speech.value(Setting::Volume).unwrap(), 0.7);

    speech.set_muted(false).unwrap();
    assert_eq!(speech.volume().unwrap(), 0.7);
}

#[tokio::test]
async fn volume_steps_apply_to_stored_value_while_muted() {
    let (speech, _) = speech_with(10);
    speech.set_volume(0.5).unwrap();
    speech.set_muted(true).unwrap();

    speech.increment(Setting::Volume).unwrap();
    assert!(approx(speech.value(Setting::Volume).unwrap(), 0.6));
    assert_eq!(speech.volume().unwrap(), 0.0);

    speech.set_muted(false).unwrap();
    assert!(approx(speech.volume().unwrap(), 0.6));
}

#[tokio::test]
async fn volume_step_flags_follow_stored_value_while_muted() {
    let (speech, _) = speech_with(10);
    speech.set_muted(true).unwrap();

    // stored volume is at its maximum even though the effective one is 0.0
    assert!(!speech.incrementable(Setting::Volume).unwrap());
    assert!(speech.decrementable(Setting::Volume).unwrap());

    speech.set_volume(0.0).unwrap();
    assert!(speech.incrementable(Setting::Volume).unwrap());
    assert!(!speech.decrementable(Setting::Volume).unwrap());

    speech.decrement(Setting::Volume).unwrap();
    assert_eq!(speech.value(Setting::Volume).unwrap(), 0.0);
    assert!(speech.muted().unwrap());
}

#[tokio::test]
async fn start_handler_sees_text_and_speaking_state() {
    let (speech, _) = speech_with(20);
    let mut events = speech.subscribe();
    let (tx, mut rx) = mpsc::unbounded_channel();

    speech.set_text("hello");
    let weak = Arc::downgrade(&speech);
    speech.on_start(move |u| {
        let speaking = weak.upgrade().map(|s| s.is_speaking()).unwrap_or(false);
        let _ = tx.send((u.text.clone(), speaking));
    });
    speech.speak().unwrap();

    let (text, speaking) = recv(&mut rx).await;
    assert_eq!(text, "hello");
    assert!(speaking);

    let seen = until_terminal(&mut events).await;
    let starts = seen.iter().filter(|e| e.kind() == EventKind::Start).count();
    assert_eq!(starts, 1);
    assert_eq!(seen.last().map(|e| e.kind()), Some(EventKind::Finish));
    assert!(!speech.is_speaking());
}

#[tokio::test]
async fn speak_while_speaking_is_ignored() {
    let (speech, engine) = speech_with(100);
    let mut events = speech.subscribe();

    speech.set_text("one two");
    speech.speak().unwrap();
    assert!(speech.is_speaking());
    speech.speak().unwrap();
    speech.speak().unwrap();

    let seen = until_terminal(&mut events).await;
    let starts = seen.iter().filter(|e| e.kind() == EventKind::Start).count();
    assert_eq!(starts, 1);
    assert_eq!(engine.vocalizer().spoken(), vec!["one", "two"]);
}

#[tokio::test]
async fn pause_resume_stop_from_handlers() {
    let (speech, _) = speech_with(300);
    let (tx, mut rx) = mpsc::unbounded_channel::<(EventKind, bool, bool)>();

    speech.set_text("text");

    let s = Arc::downgrade(&speech);
    speech.on_start(move |_| {
        if let Some(s) = s.upgrade() {
            s.speak().unwrap(); // skipped
            assert!(s.is_speaking());
            s.pause(Boundary::Immediate).unwrap();
        }
    });

    let (s, t) = (Arc::downgrade(&speech), tx.clone());
    speech.on_pause(move |_| {
        if let Some(s) = s.upgrade() {
            let _ = t.send((EventKind::Pause, s.is_speaking(), s.is_paused()));
            s.resume().unwrap();
        }
    });

    let (s, t) = (Arc::downgrade(&speech), tx.clone());
    speech.on_resume(move |_| {
        if let Some(s) = s.upgrade() {
            let _ = t.send((EventKind::Resume, s.is_speaking(), s.is_paused()));
            s.stop(Boundary::Immediate).unwrap();
        }
    });

    let (s, t) = (Arc::downgrade(&speech), tx.clone());
    speech.on_cancel(move |_| {
        if let Some(s) = s.upgrade() {
            let _ = t.send((EventKind::Cancel, s.is_speaking(), s.is_paused()));
        }
    });

    speech.speak().unwrap();

    assert_eq!(recv(&mut rx).await, (EventKind::Pause, true, true));
    assert_eq!(recv(&mut rx).await, (EventKind::Resume, true, false));
    assert_eq!(recv(&mut rx).await, (EventKind::Cancel, false, false));
    assert!(!speech.is_speaking());
}

#[tokio::test]
async fn will_speak_range_reports_word_ranges() {
    let (speech, _) = speech_with(10);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    speech.on_will_speak_range(move |range, _| {
        let _ = tx.send(range);
    });
    speech.on_finish(move |u| {
        let _ = done_tx.send(u.text.clone());
    });

    speech.set_text("text");
    speech.speak().unwrap();

    assert_eq!(recv(&mut rx).await, CharRange::new(0, 4));
    assert_eq!(recv(&mut done_rx).await, "text");
}

#[tokio::test]
async fn pending_utterance_picks_up_latest_settings() {
    let (speech, _) = speech_with(10);
    let mut events = speech.subscribe();

    speech.set_text("later");
    speech.set_rate(0.8).unwrap();
    speech.set_pitch_multiplier(1.5).unwrap();
    speech.set_language("fr-FR").unwrap();
    speech.set_muted(true).unwrap();
    speech.speak().unwrap();

    match next_event(&mut events).await {
        SpeechEvent::Started(u) => {
            assert_eq!(u.text, "later");
            assert_eq!(u.rate, 0.8);
            assert_eq!(u.pitch_multiplier, 1.5);
            assert_eq!(u.volume, 0.0);
            assert_eq!(u.language, "fr-FR");
            assert_eq!(u.voice.map(|v| v.language), Some("fr-FR".to_string()));
        }
        other => panic!("unexpected event {:?}", other),
    }
    until_terminal(&mut events).await;
    assert_eq!(speech.utterance().rate, 0.8);
}

#[tokio::test]
async fn blank_text_is_not_spoken() {
    let (speech, engine) = speech_with(10);
    speech.set_text("   ");
    speech.speak().unwrap();
    assert!(!speech.is_speaking());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.vocalizer().spoken().is_empty());
}

#[tokio::test]
async fn unknown_language_surfaces_engine_unavailable() {
    let (speech, _) = speech_with(10);
    speech.set_language("xx-YY").unwrap();
    speech.set_text("hello");

    let err = speech.speak().unwrap_err();
    assert!(matches!(err, CadenceError::EngineUnavailable(_)));
    assert!(!speech.is_speaking());
}

#[tokio::test]
async fn engine_failure_reaches_error_handler() {
    let engine = PacedEngine::new(
        SimulatedVocalizer::new(Duration::from_millis(5)).failing_on("broken"),
    );
    let speech = Speech::new(engine, Preferences::in_memory());
    let (tx, mut rx) = mpsc::unbounded_channel();
    speech.on_error(move |message, u| {
        let _ = tx.send((message.to_string(), u.text.clone()));
    });

    speech.set_text("a broken sentence");
    speech.speak().unwrap();

    let (message, text) = recv(&mut rx).await;
    assert!(message.starts_with("Engine error:"), "{}", message);
    assert!(message.contains("broken"));
    assert_eq!(text, "a broken sentence");
    assert!(!speech.is_speaking());
}

#[tokio::test]
async fn transport_commands_while_idle_are_noops() {
    let (speech, _) = speech_with(10);
    speech.pause(Boundary::Immediate).unwrap();
    speech.resume().unwrap();
    speech.stop(Boundary::Word).unwrap();
    assert!(!speech.is_speaking());
    assert!(!speech.is_paused());
}

#[tokio::test]
async fn reset_clears_preferences_handlers_and_speech() {
    let (speech, _) = speech_with(200);
    let mut events = speech.subscribe();

    speech.set_language("ja-JP").unwrap();
    speech.set_rate(0.9).unwrap();
    speech.set_volume(0.2).unwrap();
    speech.set_muted(true).unwrap();
    speech.on_start(|_| {});
    speech.on_finish(|_| {});
    speech.on_pause(|_| {});
    speech.on_resume(|_| {});
    speech.on_cancel(|_| {});
    speech.on_will_speak_range(|_, _| {});
    speech.on_error(|_, _| {});

    speech.set_text("a long sentence to interrupt");
    speech.speak().unwrap();
    assert_eq!(next_event(&mut events).await.kind(), EventKind::Start);

    speech.reset().unwrap();

    for kind in EventKind::ALL {
        assert!(!speech.has_handler(kind), "{:?} still registered", kind);
    }
    assert_eq!(speech.text(), "");
    assert_eq!(speech.utterance(), Default::default());
    assert_eq!(speech.language().unwrap(), "en-US");
    assert_eq!(speech.rate().unwrap(), Setting::Rate.default_value());
    assert_eq!(speech.volume().unwrap(), Setting::Volume.default_value());
    assert!(!speech.muted().unwrap());

    let seen = until_terminal(&mut events).await;
    assert_eq!(seen.last().map(|e| e.kind()), Some(EventKind::Cancel));
    assert!(!speech.is_speaking());
}

#[tokio::test]
async fn voice_directory_lists_languages() {
    let engine = PacedEngine::new(
        SimulatedVocalizer::new(Duration::from_millis(5)).with_voices(vec![
            Voice::new("1", "A", "en-US"),
            Voice::new("2", "B", "en-US"),
            Voice::new("3", "C", "de-DE"),
        ]),
    );
    let speech = Speech::new(engine, Preferences::in_memory());

    assert_eq!(speech.voices().unwrap().len(), 3);
    assert_eq!(speech.languages().unwrap(), vec!["en-US", "de-DE"]);

    let first = speech.languages().unwrap()[1].clone();
    speech.set_language(&first).unwrap();
    assert_eq!(
        speech.voice().unwrap().map(|v| v.language),
        Some("de-DE".to_string())
    );
}

#[tokio::test]
async fn builder_applies_config_defaults() {
    let engine = PacedEngine::new(SimulatedVocalizer::new(Duration::from_millis(5)));
    let speech = Speech::builder()
        .engine(engine)
        .defaults(cadence_core::SettingDefaults {
            rate: 0.3,
            pitch_multiplier: 1.0,
            volume: 0.5,
        })
        .build()
        .unwrap();

    assert_eq!(speech.rate().unwrap(), 0.3);
    assert_eq!(speech.volume().unwrap(), 0.5);

    speech.set_rate(0.6).unwrap();
    speech.reset().unwrap();
    assert_eq!(speech.rate().unwrap(), 0.3);
}

#[tokio::test]
async fn builder_requires_engine() {
    let err = Speech::builder().build().err().expect("should fail");
    assert!(matches!(err, CadenceError::EngineUnavailable(_)));
}
