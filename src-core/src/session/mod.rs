//! 实时语音会话管理模块
//!
//! 管理与远端媒体房间的唯一连接，并把房间事件归并为 UI 可读的 Agent 状态
//!
//! # 工作流程
//!
//! ```text
//! 1. connect(token, server_url)
//!    └── Phase: Disconnected -> Connecting    Agent: idle -> thinking
//!
//! 2. 握手成功，接入事件泵，发布麦克风
//!    └── Phase: Connecting -> Connected       Agent: thinking -> listening
//!
//! 3. 房间事件（任意顺序）
//!    ├── TrackSubscribed(audio)               Agent: -> speaking
//!    ├── TrackUnsubscribed(audio)             Agent: -> thinking / listening
//!    ├── ActiveSpeakersChanged                Agent: -> speaking / thinking / listening
//!    └── DataReceived("...thinking...")       Agent: -> thinking（直到下一次结构性事件）
//!
//! 4. disconnect() 或协调器被丢弃
//!    └── Phase: -> Disconnected               Agent: -> idle
//! ```

mod coordinator;
mod error;

pub use coordinator::{ConnectOutcome, SessionConfig, VoiceCoordinator, DEFAULT_CONNECT_TIMEOUT_MS};
pub use error::{SessionError, SessionResult};
