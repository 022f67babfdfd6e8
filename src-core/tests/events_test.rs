//! 房间事件归并集成测试

use futures_util::StreamExt;
use std::sync::{Arc, Mutex};

use voxroom_lib::events::{decode_advisory, EventAggregator};
use voxroom_lib::state::{AgentState, ConnectionPhase, SessionId, Update};
use voxroom_lib::transport::{
    MockConnector, ParticipantIdentity, RemoteTrack, RoomConnector, RoomEvent,
};

// ==================== 提示解码 ====================

#[test]
fn test_decode_advisory_keywords() {
    assert_eq!(
        decode_advisory(b"agent is thinking now"),
        Some(AgentState::Thinking)
    );
    assert_eq!(
        decode_advisory(b"listening"),
        Some(AgentState::Listening)
    );
    assert_eq!(decode_advisory(b""), None);
}

#[test]
fn test_decode_advisory_is_case_sensitive() {
    assert_eq!(decode_advisory(b"THINKING"), None);
}

#[test]
fn test_decode_advisory_tolerates_invalid_utf8() {
    assert_eq!(decode_advisory(&[0xf0, 0x28, 0x8c, 0x28]), None);
    assert_eq!(
        decode_advisory(b"\xffagent is speaking\xfe"),
        Some(AgentState::Speaking)
    );
}

// ==================== 事件泵 ====================

#[tokio::test]
async fn test_pump_over_mock_room() {
    let connector = MockConnector::new("user-7");
    let (room, events) = connector.connect("wss://mock", "token").await.unwrap();
    let controller = connector.last_room().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let pump = EventAggregator::new(SessionId(9), room.local_identity()).spawn(
        events,
        move |session, update| {
            sink.lock().unwrap().push((session, update));
        },
    );

    controller.emit(RoomEvent::ActiveSpeakersChanged(vec![
        ParticipantIdentity::new("user-7"),
    ]));
    controller.emit(RoomEvent::TrackSubscribed(RemoteTrack::audio("TR_1", "agent")));
    controller.emit(RoomEvent::DataReceived {
        payload: b"speaking".to_vec(),
        sender: None,
    });
    room.disconnect().await.unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(1), pump)
        .await
        .expect("pump did not finish")
        .unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.iter().all(|(session, _)| *session == SessionId(9)));

    let updates: Vec<&Update> = seen.iter().map(|(_, update)| update).collect();
    assert_eq!(updates[0], &Update::PhaseChanged(ConnectionPhase::Connected));
    assert!(matches!(
        updates[1],
        Update::SpeakersChanged {
            remote_speaking: false,
            ..
        }
    ));
    assert_eq!(updates[2].name(), "audio_subscribed");
    assert_eq!(updates[3], &Update::Advisory(AgentState::Speaking));

    // 传输层的断开事件与事件流结束各报告一次
    let tail: Vec<&Update> = updates[4..].to_vec();
    assert!(!tail.is_empty());
    assert!(tail
        .iter()
        .all(|u| **u == Update::PhaseChanged(ConnectionPhase::Disconnected)));
}

#[tokio::test]
async fn test_pump_over_plain_stream() {
    let events = futures_util::stream::iter(vec![RoomEvent::ConnectionStateChanged(
        ConnectionPhase::Reconnecting,
    )])
    .boxed();

    let count = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&count);
    EventAggregator::new(SessionId(1), ParticipantIdentity::new("me"))
        .spawn(events, move |_, _| *sink.lock().unwrap() += 1)
        .await
        .unwrap();

    assert_eq!(*count.lock().unwrap(), 2);
}
