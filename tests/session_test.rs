use ricotta::playback::session::SessionEvent;
use ricotta::playback::{PlayOutcome, SessionState, UtteranceSession};
use ricotta::tts::{EngineEvent, EngineHandle};
use ricotta::voice::Voice;
use std::sync::Arc;

mod common;
use common::mock_engine::{EngineCall, MockEngine};

async fn session() -> (Arc<MockEngine>, UtteranceSession) {
    let engine = Arc::new(MockEngine::new());
    let handle = EngineHandle::new(engine.clone());
    let session = UtteranceSession::new(handle.claim().await);
    engine.clear();
    (engine, session)
}

fn paulina() -> Option<Voice> {
    Some(Voice::new("Paulina", "es-MX"))
}

#[tokio::test]
async fn test_configure_alone_never_speaks() {
    let (engine, mut session) = session().await;
    session.configure("hola", paulina(), 0.8).await.unwrap();
    session.configure("hola", paulina(), 0.8).await.unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_second_play_while_speaking_is_ignored() {
    let (engine, mut session) = session().await;
    session.configure("hola amigo", paulina(), 0.8).await.unwrap();

    let first = session.play().await.unwrap();
    let second = session.play().await.unwrap();

    assert!(matches!(first, PlayOutcome::Started(_)));
    assert_eq!(second, PlayOutcome::Ignored);
    assert_eq!(engine.spoken().len(), 1);
    assert_eq!(engine.spoken()[0].text, "hola amigo");
    assert!((engine.spoken()[0].rate - 0.8).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_pause_then_play_resumes_without_restart() {
    let (engine, mut session) = session().await;
    session.configure("buenos días amigos", paulina(), 1.0).await.unwrap();
    let PlayOutcome::Started(id) = session.play().await.unwrap() else {
        panic!("expected a fresh start");
    };

    let mut indices = Vec::new();
    for char_index in [0, 7] {
        if let Some(SessionEvent::Boundary { char_index, .. }) =
            session.accept(&EngineEvent::Boundary { utterance: id, char_index })
        {
            indices.push(char_index);
        }
    }

    assert!(session.pause().await.unwrap());
    assert_eq!(session.state(), SessionState::Paused);
    assert_eq!(session.play().await.unwrap(), PlayOutcome::Resumed);
    assert_eq!(session.live(), Some(id));

    if let Some(SessionEvent::Boundary { char_index, .. }) =
        session.accept(&EngineEvent::Boundary { utterance: id, char_index: 12 })
    {
        indices.push(char_index);
    }

    assert_eq!(indices, vec![0, 7, 12]);
    assert_eq!(engine.spoken().len(), 1);
    assert_eq!(engine.count(&EngineCall::Resume), 1);
}

#[tokio::test]
async fn test_play_without_voice_is_silent_noop() {
    let (engine, mut session) = session().await;
    session.configure("hola", None, 1.0).await.unwrap();

    assert_eq!(session.play().await.unwrap(), PlayOutcome::Ignored);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_empty_text_is_not_spoken() {
    let (engine, mut session) = session().await;
    session.configure("   ", paulina(), 1.0).await.unwrap();
    assert_eq!(session.play().await.unwrap(), PlayOutcome::Ignored);
    assert!(engine.spoken().is_empty());
}

#[tokio::test]
async fn test_reconfigure_supersedes_live_utterance() {
    let (engine, mut session) = session().await;
    session.configure("uno dos", paulina(), 1.0).await.unwrap();
    let PlayOutcome::Started(old) = session.play().await.unwrap() else {
        panic!("expected a fresh start");
    };

    session.configure("tres cuatro", paulina(), 1.0).await.unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(engine.count(&EngineCall::CancelAll), 1);

    // Late events of the old utterance are dropped
    assert!(session
        .accept(&EngineEvent::Boundary { utterance: old, char_index: 4 })
        .is_none());
    assert!(session.accept(&EngineEvent::Ended { utterance: old }).is_none());

    let PlayOutcome::Started(new) = session.play().await.unwrap() else {
        panic!("expected a fresh start");
    };
    assert_ne!(old, new);
    assert_eq!(engine.spoken().last().unwrap().text, "tres cuatro");
}

#[tokio::test]
async fn test_end_returns_to_idle_and_replays_from_start() {
    let (engine, mut session) = session().await;
    session.configure("hola", paulina(), 1.0).await.unwrap();
    let PlayOutcome::Started(id) = session.play().await.unwrap() else {
        panic!("expected a fresh start");
    };

    assert_eq!(
        session.accept(&EngineEvent::Ended { utterance: id }),
        Some(SessionEvent::Ended(id))
    );
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.live().is_none());

    assert!(matches!(session.play().await.unwrap(), PlayOutcome::Started(_)));
    assert_eq!(engine.spoken().len(), 2);
}

#[tokio::test]
async fn test_retarget_does_not_touch_live_utterance() {
    let (engine, mut session) = session().await;
    session.configure("hola amigo", paulina(), 0.8).await.unwrap();
    session.play().await.unwrap();
    let live = session.live();

    session.retarget(Some(Voice::new("Monica", "es-ES")), 1.0);

    assert_eq!(session.live(), live);
    assert_eq!(session.state(), SessionState::Speaking);
    assert_eq!(engine.count(&EngineCall::CancelAll), 0);
    assert_eq!(session.voice().unwrap().name, "Monica");
    assert_eq!(session.rate(), 1.0);
    assert_eq!(session.text(), "hola amigo");
}

#[tokio::test]
async fn test_engine_failure_leaves_session_idle() {
    let (engine, mut session) = session().await;
    session.configure("hola", paulina(), 1.0).await.unwrap();
    engine.fail(true);

    assert!(session.play().await.is_err());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.live().is_none());
}
