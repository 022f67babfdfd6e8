/// Application configuration
pub mod config;

/// Room event aggregation
pub mod events;

/// Voice session lifecycle
pub mod session;

/// Session state, reducer and snapshots
pub mod state;

/// Room access tokens
pub mod token;

/// Media transport abstraction
pub mod transport;

/// Utility modules
pub mod utils;

pub use session::{ConnectOutcome, SessionConfig, SessionError, VoiceCoordinator};
pub use state::{AgentState, ConnectionPhase, SessionSnapshot};
