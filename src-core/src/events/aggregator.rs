/// Room event aggregation
///
/// Turns the heterogeneous, unordered room event stream of one session into
/// reducer updates. Each handler performs a narrow mapping and leaves all
/// interpretation of the combined state to the projector.

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::events::advisory::decode_advisory;
use crate::state::{ConnectionPhase, RemoteAudioHandle, SessionId, Update};
use crate::transport::{ParticipantIdentity, RoomEvent, RoomEventStream};

/// Event aggregator bound to one session
///
/// Every update it produces is tagged with the session id so the consumer
/// can discard updates from a session that is no longer current.
#[derive(Debug, Clone)]
pub struct EventAggregator {
    /// Session whose stream is being aggregated
    session: SessionId,

    /// Local participant, excluded when looking for the agent among speakers
    local_identity: ParticipantIdentity,
}

impl EventAggregator {
    /// Create an aggregator for `session`
    pub fn new(session: SessionId, local_identity: ParticipantIdentity) -> Self {
        Self {
            session,
            local_identity,
        }
    }

    /// Session this aggregator is bound to
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Map a single room event to a reducer update
    ///
    /// Returns `None` for events that carry nothing the coordinator tracks
    /// (video tracks, undecodable or keyword-less data payloads).
    pub fn interpret(&self, event: RoomEvent) -> Option<Update> {
        match event {
            RoomEvent::ConnectionStateChanged(phase) => {
                info!(session = %self.session, phase = %phase, "Room connection state changed");
                Some(Update::PhaseChanged(phase))
            }
            RoomEvent::TrackSubscribed(track) => {
                if !track.is_audio() {
                    debug!(session = %self.session, sid = %track.sid, "Ignoring non-audio track");
                    return None;
                }
                info!(
                    session = %self.session,
                    sid = %track.sid,
                    participant = %track.participant,
                    "Remote audio subscribed"
                );
                Some(Update::AudioSubscribed(RemoteAudioHandle::from(&track)))
            }
            RoomEvent::TrackUnsubscribed(track) => {
                if !track.is_audio() {
                    return None;
                }
                info!(session = %self.session, sid = %track.sid, "Remote audio unsubscribed");
                Some(Update::AudioUnsubscribed(track.sid))
            }
            RoomEvent::ActiveSpeakersChanged(speakers) => {
                let remote_speaking = speakers
                    .iter()
                    .any(|speaker| *speaker != self.local_identity);
                debug!(
                    session = %self.session,
                    count = speakers.len(),
                    remote_speaking,
                    "Active speakers changed"
                );
                Some(Update::SpeakersChanged {
                    speakers,
                    remote_speaking,
                })
            }
            RoomEvent::DataReceived { payload, sender } => {
                let sender = sender
                    .as_ref()
                    .map(ParticipantIdentity::as_str)
                    .unwrap_or("unknown");
                match decode_advisory(&payload) {
                    Some(state) => {
                        debug!(session = %self.session, sender, state = %state, "Agent advisory received");
                        Some(Update::Advisory(state))
                    }
                    None => {
                        debug!(session = %self.session, sender, "Data message without advisory");
                        None
                    }
                }
            }
        }
    }

    /// Spawn the event pump for this session
    ///
    /// Reads `events` until the stream ends, calling `on_update` for every
    /// interpreted event. A stream that ends on its own means the transport
    /// went away, which is reported as `Disconnected`.
    ///
    /// # Example
    /// ```no_run
    /// use voxroom_lib::events::EventAggregator;
    /// use voxroom_lib::state::SessionId;
    /// use voxroom_lib::transport::{MockConnector, RoomConnector};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let connector = MockConnector::default();
    ///     let (room, events) = connector.connect("wss://mock", "token").await.unwrap();
    ///
    ///     let aggregator = EventAggregator::new(SessionId(1), room.local_identity());
    ///     let pump = aggregator.spawn(events, |session, update| {
    ///         println!("{}: {:?}", session, update);
    ///     });
    ///     pump.abort();
    /// }
    /// ```
    pub fn spawn<F>(self, mut events: RoomEventStream, on_update: F) -> JoinHandle<()>
    where
        F: Fn(SessionId, Update) + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            debug!(session = %self.session, "Room event pump starting");

            let mut event_count = 0u64;
            while let Some(event) = events.next().await {
                event_count += 1;
                debug!(session = %self.session, event = event.name(), "Room event");

                if let Some(update) = self.interpret(event) {
                    on_update(self.session, update);
                }
            }

            info!(
                session = %self.session,
                event_count,
                "Room event stream ended"
            );
            on_update(
                self.session,
                Update::PhaseChanged(ConnectionPhase::Disconnected),
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AgentState;
    use crate::transport::{RemoteTrack, TrackSid};

    fn aggregator() -> EventAggregator {
        EventAggregator::new(SessionId(1), ParticipantIdentity::new("user-local"))
    }

    #[test]
    fn test_audio_subscribe_maps_to_handle() {
        let update = aggregator().interpret(RoomEvent::TrackSubscribed(RemoteTrack::audio(
            "TR_1", "agent",
        )));
        match update {
            Some(Update::AudioSubscribed(handle)) => {
                assert_eq!(handle.track_sid.as_str(), "TR_1");
                assert_eq!(handle.participant.as_str(), "agent");
            }
            other => panic!("Expected AudioSubscribed, got {:?}", other),
        }
    }

    #[test]
    fn test_video_tracks_are_ignored() {
        let agg = aggregator();
        assert!(agg
            .interpret(RoomEvent::TrackSubscribed(RemoteTrack::video("TR_v", "agent")))
            .is_none());
        assert!(agg
            .interpret(RoomEvent::TrackUnsubscribed(RemoteTrack::video("TR_v", "agent")))
            .is_none());
    }

    #[test]
    fn test_unsubscribe_carries_sid() {
        let update = aggregator().interpret(RoomEvent::TrackUnsubscribed(RemoteTrack::audio(
            "TR_1", "agent",
        )));
        assert_eq!(update, Some(Update::AudioUnsubscribed(TrackSid::new("TR_1"))));
    }

    #[test]
    fn test_speakers_exclude_local_participant() {
        let agg = aggregator();

        let only_local = agg.interpret(RoomEvent::ActiveSpeakersChanged(vec![
            ParticipantIdentity::new("user-local"),
        ]));
        assert!(matches!(
            only_local,
            Some(Update::SpeakersChanged {
                remote_speaking: false,
                ..
            })
        ));

        let with_agent = agg.interpret(RoomEvent::ActiveSpeakersChanged(vec![
            ParticipantIdentity::new("user-local"),
            ParticipantIdentity::new("agent"),
        ]));
        assert!(matches!(
            with_agent,
            Some(Update::SpeakersChanged {
                remote_speaking: true,
                ..
            })
        ));

        let empty = agg.interpret(RoomEvent::ActiveSpeakersChanged(vec![]));
        assert!(matches!(
            empty,
            Some(Update::SpeakersChanged {
                remote_speaking: false,
                ..
            })
        ));
    }

    #[test]
    fn test_data_messages() {
        let agg = aggregator();

        let update = agg.interpret(RoomEvent::DataReceived {
            payload: b"agent is thinking now".to_vec(),
            sender: Some(ParticipantIdentity::new("agent")),
        });
        assert_eq!(update, Some(Update::Advisory(AgentState::Thinking)));

        let malformed = agg.interpret(RoomEvent::DataReceived {
            payload: vec![0xc3, 0x28],
            sender: None,
        });
        assert!(malformed.is_none());

        let unrelated = agg.interpret(RoomEvent::DataReceived {
            payload: b"hello".to_vec(),
            sender: None,
        });
        assert!(unrelated.is_none());
    }

    #[tokio::test]
    async fn test_pump_reports_end_of_stream() {
        use std::sync::{Arc, Mutex};

        let events = futures_util::stream::iter(vec![
            RoomEvent::ConnectionStateChanged(ConnectionPhase::Connected),
            RoomEvent::TrackSubscribed(RemoteTrack::video("TR_v", "agent")),
            RoomEvent::TrackSubscribed(RemoteTrack::audio("TR_a", "agent")),
        ])
        .boxed();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        aggregator()
            .spawn(events, move |session, update| {
                sink.lock().unwrap().push((session, update.name()));
            })
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (SessionId(1), "phase_changed"),
                (SessionId(1), "audio_subscribed"),
                (SessionId(1), "phase_changed"),
            ]
        );
    }
}
