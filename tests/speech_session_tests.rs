// Integration tests for the speech session state machine
//
// These tests drive a session by hand, the same way the driver does, and
// check the handshake, turn identity and duration guards.

use anyhow::Result;
use speech_stream::audio::wav;
use speech_stream::protocol::frame;
use speech_stream::{
    CloseReason, SessionAction, SessionConfig, SessionState, SpeechError, SpeechEvent,
    SpeechSession,
};
use std::time::Duration;

fn streaming_session() -> Result<SpeechSession> {
    let mut session = SpeechSession::new(SessionConfig::default());
    session.begin_connection();
    session.on_open()?;
    session.on_config_sent(true)?;
    assert_eq!(session.state(), SessionState::Streaming);
    Ok(session)
}

fn turn_end(request_id: &str) -> Vec<u8> {
    format!("Path:turn.end\r\nX-RequestId:{}\r\n\r\n{{}}", request_id).into_bytes()
}

fn audio_request_id(action: &SessionAction) -> String {
    let SessionAction::SendAudio(message) = action else {
        panic!("expected audio, got {:?}", action);
    };
    let (header, _) = frame::split_binary_message(message).expect("well-formed frame");
    header
        .lines()
        .find_map(|line| line.strip_prefix("X-RequestId: "))
        .expect("request id header")
        .to_string()
}

#[test]
fn test_open_sends_config_once() -> Result<()> {
    let mut session = SpeechSession::new(SessionConfig::default());
    let connection_id = session.begin_connection().to_string();
    assert_eq!(connection_id.len(), 32);
    assert_eq!(session.state(), SessionState::Idle);

    let actions = session.on_open()?;
    assert_eq!(actions.len(), 1);
    let SessionAction::SendConfig(message) = &actions[0] else {
        panic!("expected config, got {:?}", actions[0]);
    };
    assert!(message.starts_with("Path: speech.config\r\n"));
    assert!(message.contains("\"system\""));
    assert_eq!(session.state(), SessionState::AwaitingConfigAck);
    assert!(session.current_request_id().is_none());

    assert!(session.on_config_sent(true)?.is_empty());
    assert_eq!(session.state(), SessionState::Streaming);
    assert!(session.is_config_sent());
    assert_eq!(session.current_request_id().map(str::len), Some(32));

    // A repeated open on the same connection does not resend
    let actions = session.on_open()?;
    assert!(actions.iter().all(|a| !matches!(a, SessionAction::SendConfig(_))));
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(session.connection_id(), Some(connection_id.as_str()));

    Ok(())
}

#[test]
fn test_audio_waits_for_config_confirmation() -> Result<()> {
    let mut session = SpeechSession::new(SessionConfig::default());
    session.begin_connection();
    session.on_open()?;

    let chunk = wav::encode_full(&[0.1; 160], 1, 16000)?;
    assert!(session.send_audio(&chunk)?.is_none());
    assert!(session.send_audio(&chunk)?.is_none());
    assert_eq!(session.pending_audio(), 2);

    let actions = session.on_config_sent(true)?;
    assert_eq!(actions.len(), 2);
    assert_eq!(session.pending_audio(), 0);

    let request_id = session.current_request_id().map(str::to_string);
    for action in &actions {
        assert_eq!(Some(audio_request_id(action)), request_id);
    }

    let stats = session.stats();
    assert_eq!(stats.audio_frames_sent, 2);
    assert_eq!(stats.audio_bytes_sent, chunk.len() * 2);

    Ok(())
}

#[test]
fn test_pending_audio_is_bounded() -> Result<()> {
    let config = SessionConfig {
        max_pending_audio: 1,
        ..SessionConfig::default()
    };
    let mut session = SpeechSession::new(config);
    session.begin_connection();
    session.on_open()?;

    assert!(session.send_audio(&[0, 0])?.is_none());
    assert!(matches!(
        session.send_audio(&[0, 0]),
        Err(SpeechError::ConfigNotAcknowledged)
    ));

    Ok(())
}

#[test]
fn test_audio_before_open_is_rejected() {
    let mut session = SpeechSession::new(SessionConfig::default());
    session.begin_connection();

    assert!(matches!(
        session.send_audio(&[0, 0]),
        Err(SpeechError::ConfigNotAcknowledged)
    ));
}

#[test]
fn test_failed_config_send_closes() -> Result<()> {
    let mut session = SpeechSession::new(SessionConfig::default());
    session.begin_connection();
    session.on_open()?;
    session.send_audio(&[0, 0])?;

    let actions = session.on_config_sent(false)?;
    assert_eq!(actions, vec![SessionAction::Close(CloseReason::ConfigFailed)]);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.pending_audio(), 0);
    assert!(matches!(
        session.send_audio(&[0, 0]),
        Err(SpeechError::SessionClosed)
    ));

    Ok(())
}

#[test]
fn test_audio_carries_current_request_id() -> Result<()> {
    let mut session = streaming_session()?;
    let action = session.send_audio(&[1, 2, 3, 4])?.expect("audio is sent while streaming");

    assert_eq!(
        Some(audio_request_id(&action).as_str()),
        session.current_request_id()
    );

    Ok(())
}

#[test]
fn test_turn_end_rotates_request_id() -> Result<()> {
    let mut session = streaming_session()?;
    let first = session.current_request_id().map(str::to_string).expect("request id");

    let event = session.on_message(&turn_end(&first), false)?;
    assert_eq!(event, Some(SpeechEvent::TurnEnd { request_id: first.clone() }));

    let second = session.current_request_id().map(str::to_string).expect("request id");
    assert_ne!(first, second);
    assert_eq!(session.stats().turns_completed, 1);

    let action = session.send_audio(&[0, 0])?.expect("audio is sent while streaming");
    assert_eq!(audio_request_id(&action), second);

    Ok(())
}

#[test]
fn test_new_turn_rotates_request_id() -> Result<()> {
    let mut session = streaming_session()?;
    let before = session.current_request_id().map(str::to_string);
    let minted = session.new_turn().to_string();

    assert_ne!(before.as_deref(), Some(minted.as_str()));
    assert_eq!(session.current_request_id(), Some(minted.as_str()));

    Ok(())
}

#[test]
fn test_phrases_are_collected() -> Result<()> {
    let mut session = streaming_session()?;
    let request_id = session.current_request_id().map(str::to_string).expect("request id");
    let phrase = format!(
        "Path:speech.phrase\r\nX-RequestId:{}\r\n\r\n{{\"RecognitionStatus\":\"Success\",\"DisplayText\":\"Good morning.\"}}",
        request_id
    );

    session.on_message(phrase.as_bytes(), false)?;

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, "Good morning.");
    assert_eq!(transcript[0].request_id, request_id);
    assert!(transcript[0].is_success());

    Ok(())
}

#[test]
fn test_malformed_message_changes_nothing() -> Result<()> {
    let mut session = streaming_session()?;
    let request_id = session.current_request_id().map(str::to_string);

    let result = session.on_message(b"Path:turn.end\r\n\r\n{}", false);
    assert!(matches!(result, Err(SpeechError::MalformedMessage(_))));

    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(session.current_request_id().map(str::to_string), request_id);
    assert_eq!(session.stats().malformed_messages, 1);

    Ok(())
}

#[test]
fn test_unhandled_path_is_ignored() -> Result<()> {
    let mut session = streaming_session()?;
    let event = session.on_message(b"Path:speech.fragment\r\nX-RequestId:ab\r\n\r\n{}", false)?;

    assert!(event.is_none());
    assert_eq!(session.state(), SessionState::Streaming);

    Ok(())
}

#[test]
fn test_binary_inbound_frames_are_parsed() -> Result<()> {
    let mut session = streaming_session()?;
    let event = session.on_message(&turn_end("abc123"), true)?;
    assert!(matches!(event, Some(SpeechEvent::TurnEnd { .. })));
    Ok(())
}

#[test]
fn test_idle_guard_closes_once() -> Result<()> {
    let mut session = streaming_session()?;

    assert!(session.tick(Duration::from_secs(180)).is_none());
    assert_eq!(
        session.tick(Duration::from_secs(1)),
        Some(SessionAction::Close(CloseReason::IdleTimeout))
    );
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.tick(Duration::from_secs(1)).is_none());
    assert!(session.close().is_none());

    assert!(matches!(
        session.close_reason().and_then(|r| r.to_error()),
        Some(SpeechError::DurationExceeded("idle"))
    ));

    Ok(())
}

#[test]
fn test_inbound_message_resets_idle_timer() -> Result<()> {
    let mut session = streaming_session()?;

    assert!(session.tick(Duration::from_secs(170)).is_none());
    session.on_message(&turn_end("abc123"), false)?;
    assert_eq!(session.elapsed_idle(), Duration::ZERO);
    assert!(session.tick(Duration::from_secs(170)).is_none());
    assert_eq!(session.elapsed_total(), Duration::from_secs(340));

    Ok(())
}

#[test]
fn test_total_guard_closes_active_connection() -> Result<()> {
    let mut session = streaming_session()?;

    for _ in 0..6 {
        assert!(session.tick(Duration::from_secs(100)).is_none());
        session.on_message(&turn_end("abc123"), false)?;
    }
    assert_eq!(
        session.tick(Duration::from_secs(1)),
        Some(SessionAction::Close(CloseReason::MaxDuration))
    );
    assert!(matches!(
        session.close_reason().and_then(|r| r.to_error()),
        Some(SpeechError::DurationExceeded("total"))
    ));

    Ok(())
}

#[test]
fn test_timers_do_not_run_before_open() {
    let mut session = SpeechSession::new(SessionConfig::default());
    session.begin_connection();

    assert!(session.tick(Duration::from_secs(1000)).is_none());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_remote_close_resets_connection_state() -> Result<()> {
    let mut session = streaming_session()?;
    session.tick(Duration::from_secs(10));

    session.on_close("normal closure", true);

    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.is_config_sent());
    assert_eq!(session.elapsed_idle(), Duration::ZERO);
    assert_eq!(session.elapsed_total(), Duration::ZERO);
    assert!(session.current_request_id().is_none());
    assert!(session.connection_id().is_none());
    assert_eq!(
        session.close_reason(),
        Some(&CloseReason::Remote {
            reason: "normal closure".to_string(),
            was_clean: true
        })
    );

    Ok(())
}

#[test]
fn test_error_closes_and_reconnect_resends_config() -> Result<()> {
    let mut session = streaming_session()?;

    let action = session.on_error("connection reset");
    assert_eq!(
        action,
        Some(SessionAction::Close(CloseReason::TransportError(
            "connection reset".to_string()
        )))
    );
    assert!(!session.is_config_sent());

    session.begin_connection();
    assert_eq!(session.state(), SessionState::Idle);
    let actions = session.on_open()?;
    assert!(matches!(actions.as_slice(), [SessionAction::SendConfig(_)]));

    Ok(())
}

#[test]
fn test_connection_headers_use_connection_id() {
    let mut session = SpeechSession::new(SessionConfig::default());
    let connection_id = session.begin_connection().to_string();
    let header = session.connection_headers("secret");

    assert_eq!(header.get("Authorization"), Some("Bearer secret"));
    assert_eq!(header.get("X-ConnectionId"), Some(connection_id.as_str()));
}

#[test]
fn test_stats_measure_from_connection_start() {
    let mut session = SpeechSession::new(SessionConfig::default());
    let created = session.stats().started_at;

    std::thread::sleep(Duration::from_millis(20));
    session.begin_connection();
    let stats = session.stats();

    assert!(stats.started_at > created);
    assert!(stats.duration_secs < 0.02);
}
