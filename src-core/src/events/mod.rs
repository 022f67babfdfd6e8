/// Room event handling
///
/// This module normalizes the room event stream of a session into
/// reducer updates.

/// Advisory decoding for data-channel messages
pub mod advisory;

/// Per-session event aggregator and pump
pub mod aggregator;

// Re-export commonly used types
pub use advisory::{decode_advisory, ADVISORY_KEYWORDS};
pub use aggregator::EventAggregator;
