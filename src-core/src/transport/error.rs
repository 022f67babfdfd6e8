/// Transport error types for media room communication
///
/// This module defines error types reported by room connectors and room handles.

use thiserror::Error;

/// Media transport errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Failed to connect to the room server
    #[error("Failed to connect to room server: {0}")]
    ConnectionFailed(String),

    /// The server rejected the bearer token
    #[error("Authentication failed: token rejected")]
    AuthenticationFailed,

    /// Handshake did not finish in time
    #[error("Connection timeout after {0}ms")]
    Timeout(u64),

    /// Local microphone could not be captured
    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Local track could not be published to the room
    #[error("Failed to publish track: {0}")]
    PublishFailed(String),

    /// Operation attempted on a room that is already closed
    #[error("Room is disconnected")]
    Disconnected,

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Other(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
