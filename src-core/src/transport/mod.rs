/// Media room transport abstraction
///
/// The coordinator never talks to a media SDK directly; it consumes the
/// `RoomConnector` / `RoomHandle` traits defined here.

/// Transport error types
pub mod error;

/// In-memory transport used by tests and the demo binary
pub mod mock;

/// Room primitives, events and capability traits
pub mod room;

// Re-export commonly used types
pub use error::{TransportError, TransportResult};
pub use mock::{MockConnector, MockRoomController};
pub use room::{
    LocalTrack, ParticipantIdentity, RemoteTrack, RoomConnector, RoomEvent, RoomEventStream,
    RoomHandle, TrackKind, TrackSid,
};
