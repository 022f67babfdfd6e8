use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transport::{ParticipantIdentity, RemoteTrack, TrackSid};

/// Agent 状态
///
/// UI 侧看到的远端语音代理当前在做什么，由会话字段推导而来，
/// 不允许被单独修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// 空闲，没有会话
    #[default]
    Idle,

    /// 等待用户说话
    Listening,

    /// 连接中或正在思考
    Thinking,

    /// 代理正在说话
    Speaking,
}

impl AgentState {
    /// 获取状态名称（用于日志和调试）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, Self::Listening)
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, Self::Thinking)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, Self::Speaking)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 连接阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    /// 未连接
    #[default]
    Disconnected,

    /// 正在建立连接
    Connecting,

    /// 已连接
    Connected,

    /// 传输层正在重连
    Reconnecting,

    /// 连接失败
    Failed,
}

impl ConnectionPhase {
    /// 是否存在活跃会话（Connecting / Connected / Reconnecting）
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 会话编号
///
/// 每次 connect 分配一个新的编号，用于识别已经失效的会话发出的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// 远端音频句柄
///
/// 只记录代理音频轨道的存在，不持有底层媒体资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAudioHandle {
    /// 轨道编号
    pub track_sid: TrackSid,
    /// 发布该轨道的参与者
    pub participant: ParticipantIdentity,
}

impl From<&RemoteTrack> for RemoteAudioHandle {
    fn from(track: &RemoteTrack) -> Self {
        Self {
            track_sid: track.sid.clone(),
            participant: track.participant.clone(),
        }
    }
}

/// 远端通过数据通道发来的状态提示
///
/// `seq` 是产生该提示的更新序号，只有比最近一次结构性更新更新时才生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub state: AgentState,
    pub seq: u64,
}
