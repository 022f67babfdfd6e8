/// Room primitives consumed by the coordinator
///
/// These types mirror what a WebRTC room SDK hands out: participant
/// identities, track descriptors, the room event stream and the two
/// capability traits (`RoomConnector`, `RoomHandle`).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::state::ConnectionPhase;
use crate::transport::error::TransportResult;

/// Identity of a participant in a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantIdentity(String);

impl ParticipantIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Server-assigned track identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackSid(String);

impl TrackSid {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackSid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A track published by a remote participant
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    /// Track identifier
    pub sid: TrackSid,
    /// Audio or video
    pub kind: TrackKind,
    /// Publishing participant
    pub participant: ParticipantIdentity,
}

impl RemoteTrack {
    /// Create a remote audio track descriptor
    pub fn audio(sid: impl Into<String>, participant: impl Into<String>) -> Self {
        Self {
            sid: TrackSid::new(sid),
            kind: TrackKind::Audio,
            participant: ParticipantIdentity::new(participant),
        }
    }

    /// Create a remote video track descriptor
    pub fn video(sid: impl Into<String>, participant: impl Into<String>) -> Self {
        Self {
            sid: TrackSid::new(sid),
            kind: TrackKind::Video,
            participant: ParticipantIdentity::new(participant),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }
}

/// A locally captured track ready to be published
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTrack {
    /// Track name announced to the room
    pub name: String,
    /// Audio or video
    pub kind: TrackKind,
}

impl LocalTrack {
    pub fn microphone() -> Self {
        Self {
            name: "microphone".to_string(),
            kind: TrackKind::Audio,
        }
    }
}

/// Events delivered by a connected room
///
/// No ordering is guaranteed between different event classes.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// The transport connection changed phase
    ConnectionStateChanged(ConnectionPhase),

    /// A remote track became available to this participant
    TrackSubscribed(RemoteTrack),

    /// A previously subscribed remote track went away
    TrackUnsubscribed(RemoteTrack),

    /// The set of participants currently speaking changed
    ActiveSpeakersChanged(Vec<ParticipantIdentity>),

    /// A data-channel payload arrived
    DataReceived {
        payload: Vec<u8>,
        sender: Option<ParticipantIdentity>,
    },
}

impl RoomEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionStateChanged(_) => "connection_state_changed",
            Self::TrackSubscribed(_) => "track_subscribed",
            Self::TrackUnsubscribed(_) => "track_unsubscribed",
            Self::ActiveSpeakersChanged(_) => "active_speakers_changed",
            Self::DataReceived { .. } => "data_received",
        }
    }
}

/// Stream of events for one connected room
pub type RoomEventStream = BoxStream<'static, RoomEvent>;

/// Opens connections to a media room server
#[async_trait]
pub trait RoomConnector: Send + Sync {
    /// Connect to `server_url` with a bearer `token`
    ///
    /// Returns the room handle together with the room's event stream.
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> TransportResult<(Arc<dyn RoomHandle>, RoomEventStream)>;
}

/// A connected room, seen from the local participant
#[async_trait]
pub trait RoomHandle: Send + Sync {
    /// Identity of the local participant
    fn local_identity(&self) -> ParticipantIdentity;

    /// Capture the local microphone
    async fn capture_microphone(&self) -> TransportResult<LocalTrack>;

    /// Publish a local track to the room
    async fn publish_track(&self, track: LocalTrack) -> TransportResult<()>;

    /// Enable or disable the published microphone
    async fn set_microphone_enabled(&self, enabled: bool) -> TransportResult<()>;

    /// Leave the room and release transport resources
    async fn disconnect(&self) -> TransportResult<()>;
}
