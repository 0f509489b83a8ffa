use cadence_core::{Boundary, EventSink, Preferences, Speech, SpeechEngine, Utterance, Voice};
use mockall::mock;
use mockall::predicate::eq;

mock! {
    pub Engine {}

    impl SpeechEngine for Engine {
        fn name(&self) -> String;
        fn attach(&self, sink: EventSink);
        fn speak(&self, utterance: Utterance) -> cadence_core::Result<()>;
        fn pause(&self, boundary: Boundary) -> cadence_core::Result<()>;
        fn resume(&self) -> cadence_core::Result<()>;
        fn stop(&self, boundary: Boundary) -> cadence_core::Result<()>;
        fn voices(&self) -> cadence_core::Result<Vec<Voice>>;
    }
}

fn base_mock() -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_name().return_const("mock".to_string());
    engine.expect_attach().times(1).return_const(());
    engine
        .expect_voices()
        .returning(|| Ok(vec![Voice::new("m1", "Mock", "en-US")]));
    engine
}

#[tokio::test]
async fn engine_receives_a_single_speak_while_speaking() {
    let mut engine = base_mock();
    engine
        .expect_speak()
        .withf(|u: &Utterance| u.text == "hello" && u.language == "en-US")
        .times(1)
        .returning(|_| Ok(()));

    let speech = Speech::new(std::sync::Arc::new(engine), Preferences::in_memory());
    speech.set_text("hello");
    speech.speak().unwrap();
    speech.speak().unwrap();
    assert!(speech.is_speaking());
}

#[tokio::test]
async fn transport_commands_reach_engine_while_speaking() {
    let mut engine = base_mock();
    engine.expect_speak().times(1).returning(|_| Ok(()));
    engine
        .expect_pause()
        .with(eq(Boundary::Word))
        .times(1)
        .returning(|_| Ok(()));
    engine.expect_resume().times(1).returning(|| Ok(()));
    engine
        .expect_stop()
        .with(eq(Boundary::Immediate))
        .times(1)
        .returning(|_| Ok(()));

    let speech = Speech::new(std::sync::Arc::new(engine), Preferences::in_memory());
    speech.set_text("hello");
    speech.speak().unwrap();
    speech.pause(Boundary::Word).unwrap();
    speech.resume().unwrap();
    speech.stop(Boundary::Immediate).unwrap();
}

#[tokio::test]
async fn idle_facade_sends_no_transport_commands() {
    let mut engine = base_mock();
    engine.expect_speak().never();
    engine.expect_pause().never();
    engine.expect_resume().never();
    engine.expect_stop().never();

    let speech = Speech::new(std::sync::Arc::new(engine), Preferences::in_memory());
    speech.pause(Boundary::Immediate).unwrap();
    speech.resume().unwrap();
    speech.stop(Boundary::Immediate).unwrap();
    speech.reset().unwrap();
}

#[tokio::test]
async fn failed_enqueue_leaves_facade_idle() {
    let mut engine = base_mock();
    engine
        .expect_speak()
        .times(2)
        .returning(|_| Err(cadence_core::CadenceError::Engine("queue full".into())));

    let speech = Speech::new(std::sync::Arc::new(engine), Preferences::in_memory());
    speech.set_text("hello");
    assert!(speech.speak().is_err());
    assert!(!speech.is_speaking());
    assert!(speech.speak().is_err());
}

#[tokio::test]
async fn reset_stops_in_flight_speech() {
    let mut engine = base_mock();
    engine.expect_speak().times(1).returning(|_| Ok(()));
    engine
        .expect_stop()
        .with(eq(Boundary::Immediate))
        .times(1)
        .returning(|_| Ok(()));

    let speech = Speech::new(std::sync::Arc::new(engine), Preferences::in_memory());
    speech.set_text("hello");
    speech.speak().unwrap();
    speech.reset().unwrap();
}
