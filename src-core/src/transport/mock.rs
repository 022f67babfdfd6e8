//! In-memory room transport for exercising the coordinator without a media server.
//!
//! `MockConnector` hands out `MockRoom`s; every room comes with a
//! `MockRoomController` that tests use to inject room events and inspect
//! what the coordinator did to the room.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::state::ConnectionPhase;
use crate::transport::error::{TransportError, TransportResult};
use crate::transport::room::{
    LocalTrack, ParticipantIdentity, RoomConnector, RoomEvent, RoomEventStream, RoomHandle,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct Script {
    connect_calls: usize,
    connect_delay: Option<Duration>,
    microphone_delay: Option<Duration>,
    next_connect_error: Option<TransportError>,
    next_microphone_error: Option<TransportError>,
    next_publish_error: Option<TransportError>,
    rooms: Vec<MockRoomController>,
}

/// Scriptable connector producing in-memory rooms
#[derive(Clone)]
pub struct MockConnector {
    local_identity: ParticipantIdentity,
    script: Arc<Mutex<Script>>,
}

impl MockConnector {
    pub fn new(local_identity: impl Into<String>) -> Self {
        Self {
            local_identity: ParticipantIdentity::new(local_identity),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Delay every connect handshake by `delay`
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        lock(&self.script).connect_delay = Some(delay);
        self
    }

    /// Delay every microphone capture by `delay`
    pub fn with_microphone_delay(self, delay: Duration) -> Self {
        lock(&self.script).microphone_delay = Some(delay);
        self
    }

    /// Make the next connect fail with `error`
    pub fn fail_next_connect(&self, error: TransportError) {
        lock(&self.script).next_connect_error = Some(error);
    }

    /// Make microphone capture fail on the next room handed out
    pub fn fail_next_microphone(&self, error: TransportError) {
        lock(&self.script).next_microphone_error = Some(error);
    }

    /// Make track publishing fail on the next room handed out
    pub fn fail_next_publish(&self, error: TransportError) {
        lock(&self.script).next_publish_error = Some(error);
    }

    /// Number of connect handshakes attempted so far
    pub fn connect_calls(&self) -> usize {
        lock(&self.script).connect_calls
    }

    /// Controllers of every room handed out, oldest first
    pub fn rooms(&self) -> Vec<MockRoomController> {
        lock(&self.script).rooms.clone()
    }

    /// Controller of the most recent room
    pub fn last_room(&self) -> Option<MockRoomController> {
        lock(&self.script).rooms.last().cloned()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new("user-local")
    }
}

#[async_trait]
impl RoomConnector for MockConnector {
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> TransportResult<(Arc<dyn RoomHandle>, RoomEventStream)> {
        let (delay, error) = {
            let mut script = lock(&self.script);
            script.connect_calls += 1;
            (script.connect_delay, script.next_connect_error.take())
        };

        tracing::debug!(server_url, token_len = token.len(), "Mock connect");

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = error {
            return Err(error);
        }
        if token.is_empty() {
            return Err(TransportError::AuthenticationFailed);
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        // Real transports report Connected on their own event stream.
        let _ = event_tx.send(RoomEvent::ConnectionStateChanged(ConnectionPhase::Connected));

        let mut script = lock(&self.script);
        let state = Arc::new(RoomState {
            sender: Mutex::new(Some(event_tx)),
            log: Mutex::new(RoomLog {
                microphone_delay: script.microphone_delay,
                microphone_error: script.next_microphone_error.take(),
                publish_error: script.next_publish_error.take(),
                ..RoomLog::default()
            }),
        });
        script.rooms.push(MockRoomController {
            state: Arc::clone(&state),
        });

        let room = MockRoom {
            identity: self.local_identity.clone(),
            state,
        };
        let events = futures_util::stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed();

        Ok((Arc::new(room) as Arc<dyn RoomHandle>, events))
    }
}

#[derive(Debug, Default)]
struct RoomLog {
    published: Vec<LocalTrack>,
    microphone_enabled: bool,
    microphone_toggles: usize,
    disconnect_calls: usize,
    microphone_delay: Option<Duration>,
    microphone_error: Option<TransportError>,
    publish_error: Option<TransportError>,
    toggle_error: Option<TransportError>,
}

#[derive(Debug)]
struct RoomState {
    sender: Mutex<Option<mpsc::UnboundedSender<RoomEvent>>>,
    log: Mutex<RoomLog>,
}

/// Test-side handle on a mock room
#[derive(Debug, Clone)]
pub struct MockRoomController {
    state: Arc<RoomState>,
}

impl MockRoomController {
    /// Deliver `event` on the room's event stream
    ///
    /// Returns `false` once the room has been disconnected.
    pub fn emit(&self, event: RoomEvent) -> bool {
        match lock(&self.state.sender).as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Make the next microphone enable/disable call fail
    pub fn fail_next_microphone_toggle(&self, error: TransportError) {
        lock(&self.state.log).toggle_error = Some(error);
    }

    pub fn published_tracks(&self) -> Vec<LocalTrack> {
        lock(&self.state.log).published.clone()
    }

    pub fn microphone_enabled(&self) -> bool {
        lock(&self.state.log).microphone_enabled
    }

    pub fn microphone_toggles(&self) -> usize {
        lock(&self.state.log).microphone_toggles
    }

    pub fn disconnect_calls(&self) -> usize {
        lock(&self.state.log).disconnect_calls
    }

    pub fn is_disconnected(&self) -> bool {
        lock(&self.state.sender).is_none()
    }
}

/// Room handle handed to the coordinator
struct MockRoom {
    identity: ParticipantIdentity,
    state: Arc<RoomState>,
}

impl MockRoom {
    fn ensure_open(&self) -> TransportResult<()> {
        if lock(&self.state.sender).is_none() {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl RoomHandle for MockRoom {
    fn local_identity(&self) -> ParticipantIdentity {
        self.identity.clone()
    }

    async fn capture_microphone(&self) -> TransportResult<LocalTrack> {
        self.ensure_open()?;
        let delay = lock(&self.state.log).microphone_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = lock(&self.state.log).microphone_error.take() {
            return Err(error);
        }
        Ok(LocalTrack::microphone())
    }

    async fn publish_track(&self, track: LocalTrack) -> TransportResult<()> {
        self.ensure_open()?;
        let mut log = lock(&self.state.log);
        if let Some(error) = log.publish_error.take() {
            return Err(error);
        }
        log.published.push(track);
        log.microphone_enabled = true;
        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> TransportResult<()> {
        self.ensure_open()?;
        let mut log = lock(&self.state.log);
        if let Some(error) = log.toggle_error.take() {
            return Err(error);
        }
        log.microphone_enabled = enabled;
        log.microphone_toggles += 1;
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        lock(&self.state.log).disconnect_calls += 1;
        if let Some(tx) = lock(&self.state.sender).take() {
            // Trailing event, as real transports emit after teardown.
            let _ = tx.send(RoomEvent::ConnectionStateChanged(
                ConnectionPhase::Disconnected,
            ));
        }
        Ok(())
    }
}
