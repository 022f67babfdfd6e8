/// Decoding of agent advisories received on the data channel
///
/// The remote agent publishes free-text status hints. A payload is matched
/// against the keywords below in priority order; the first keyword found
/// anywhere in the text wins.

use std::borrow::Cow;

use crate::state::AgentState;

/// Keywords checked in priority order
pub const ADVISORY_KEYWORDS: [(&str, AgentState); 3] = [
    ("listening", AgentState::Listening),
    ("thinking", AgentState::Thinking),
    ("speaking", AgentState::Speaking),
];

/// Decode a data-channel payload into an advisory
///
/// Invalid UTF-8 sequences are replaced rather than rejected, so a keyword
/// surrounded by stray bytes still counts.
///
/// # Returns
/// * `Some(state)` - payload names an agent state
/// * `None` - no keyword found
///
/// # Example
/// ```
/// use voxroom_lib::events::decode_advisory;
/// use voxroom_lib::state::AgentState;
///
/// let state = decode_advisory(b"agent is thinking now");
/// assert_eq!(state, Some(AgentState::Thinking));
/// ```
pub fn decode_advisory(payload: &[u8]) -> Option<AgentState> {
    let text = String::from_utf8_lossy(payload);
    if let Cow::Owned(_) = text {
        tracing::debug!(len = payload.len(), "Data payload contained invalid UTF-8");
    }

    ADVISORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, state)| *state)
}
